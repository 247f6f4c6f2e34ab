use std::sync::Arc;

use mutaties::config::Config;
use mutaties::model::Pool;
use mutaties::queue::{Mutation, MutationQueue, MutationStore, PostgresStore, Queue};
use mutaties::sync::BackgroundSync;
use mutaties::Error;

use crate::logging::{created, pending, processed, reused};

pub async fn submit(
    queue: Queue,
    code: i32,
    payload: &str,
    door: &str,
    fast: bool,
    reuse: bool,
) -> Result<(), Error> {
    let config = Config::get();
    let payload: serde_json::Value = serde_json::from_str(payload)?;
    let mutation = Mutation::new(queue, code).payload(payload)?.door(door);

    let store = Arc::new(PostgresStore::new(Pool::from_env()));
    let sync = BackgroundSync::for_queue(queue, config).await?;
    let producer = MutationQueue::new(queue, store, sync).backoff(config.wait.backoff());

    let (mutation, inserted) = if reuse {
        producer.get_or_create(mutation).await?
    } else {
        (producer.create(mutation).await?, true)
    };

    if inserted {
        created(format!("{} mutation {}", queue, mutation.id()?));
    } else {
        reused(format!("{} mutation {}", queue, mutation.id()?));
    }

    let mutation = producer.ping_background_task(&mutation, fast).await?;

    if mutation.processed {
        processed(format!("{} mutation {}", queue, mutation.id()?));
    } else {
        pending(format!("{} mutation {}", queue, mutation.id()?));
    }

    Ok(())
}

pub async fn ping(queue: Queue) -> Result<(), Error> {
    let sync = BackgroundSync::for_queue(queue, Config::get()).await?;
    sync.ping().await?;
    log::info!("Pinged {} worker at {}", queue, sync.addr());

    Ok(())
}

pub async fn stats(queue: Option<Queue>) -> Result<(), Error> {
    let store = PostgresStore::new(Pool::from_env());
    let queues = match queue {
        Some(queue) => vec![queue],
        None => Queue::all().to_vec(),
    };

    println!("{:<12} {:>8} {:>8} {:>10}", "queue", "total", "pending", "latest");

    for queue in queues {
        let latest = store
            .latest_id(queue)
            .await?
            .map(|id| id.to_string())
            .unwrap_or("-".into());

        println!(
            "{:<12} {:>8} {:>8} {:>10}",
            queue.name(),
            store.count(queue).await?,
            store.count_pending(queue).await?,
            latest
        );
    }

    let pool = store.pool().stats();
    log::debug!("{} connections open, {} idle", pool.open, pool.idle);

    Ok(())
}
