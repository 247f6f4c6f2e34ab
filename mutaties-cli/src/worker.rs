use std::sync::Arc;

use mutaties::config::Config;
use mutaties::model::Pool;
use mutaties::queue::{Mutation, MutationHandler, PostgresStore, Queue, RunFor, Worker};
use mutaties::sync::PingReceiver;
use mutaties::{async_trait, Error};

/// Accepts every mutation. The domain handlers live with the application,
/// this one is for trying out the plumbing.
struct Acknowledge;

#[async_trait]
impl MutationHandler for Acknowledge {
    async fn handle(&self, mutation: &Mutation) -> Result<bool, mutaties::queue::Error> {
        log::info!(
            "mutation {} code {} door \"{}\" payload {}",
            mutation.id()?,
            mutation.code,
            mutation.door,
            mutation.payload
        );

        Ok(true)
    }
}

pub async fn run(
    queue: Queue,
    duration: u32,
    stop_exactly: Option<u8>,
    quick: bool,
) -> Result<(), Error> {
    let mut run_for = RunFor::new(duration)?.margin(queue.overlap_margin());

    if let Some(minute) = stop_exactly {
        run_for = run_for.stop_exactly(minute)?;
    }

    if quick {
        run_for = run_for.quick();
    }

    let store = Arc::new(PostgresStore::new(Pool::from_env()));
    let receiver = PingReceiver::for_queue(queue, Config::get()).await?;

    let mut worker = Worker::new(queue, store, receiver).handler(Acknowledge);
    worker.run(&run_for).await?;

    Ok(())
}
