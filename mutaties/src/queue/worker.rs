//! Queue worker.
//!
//! One worker per queue, started by cron for a fixed amount of time. It applies the
//! mutations in the order they were written and marks each one processed. Between
//! passes it waits for a ping from a producer, or for the poll timeout to expire.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::{run_for, Error, Mutation, MutationStore, Queue, RunFor};
use crate::colors::MaybeColorize;
use crate::sync::PingReceiver;

/// Applies mutations.
///
/// A worker asks its handlers in order; the first one that returns `Ok(true)` has
/// applied the mutation and the others aren't asked.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    /// Apply the mutation. Return `false` if the code isn't one this handler knows.
    async fn handle(&self, mutation: &Mutation) -> Result<bool, Error>;

    /// Called when no new mutations came in. Do a bit of background work here,
    /// like recomputing standings.
    async fn idle(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Name used in logs.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Drains one queue.
pub struct Worker {
    queue: Queue,
    store: Arc<dyn MutationStore>,
    receiver: PingReceiver,
    handlers: Arc<Vec<Arc<dyn MutationHandler>>>,
    poll_timeout: Duration,
    highest: Option<i64>,
    mutation_count: i64,
    pings: usize,
}

impl Worker {
    pub fn new(queue: Queue, store: Arc<dyn MutationStore>, receiver: PingReceiver) -> Self {
        Self {
            queue,
            store,
            receiver,
            handlers: Arc::new(vec![]),
            poll_timeout: queue.poll_timeout(),
            highest: None,
            mutation_count: 0,
            pings: 0,
        }
    }

    /// Add a handler. Handlers are asked in the order they were added.
    pub fn handler(mut self, handler: impl MutationHandler + 'static) -> Self {
        let mut handlers = self.handlers.as_ref().clone();
        handlers.push(Arc::new(handler));
        self.handlers = Arc::new(handlers);
        self
    }

    /// Look at the table at least this often, even without pings.
    pub fn poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Number of pings received so far.
    pub fn pings(&self) -> usize {
        self.pings
    }

    /// Apply all unprocessed mutations. Returns how many were applied.
    ///
    /// After the first pass only mutations newer than the newest one seen in the
    /// previous pass are considered. If a handler fails, the pass stops and the
    /// mutation stays unprocessed.
    pub async fn process_new(&mut self) -> Result<usize, Error> {
        let start = Instant::now();
        let latest = self.store.latest_id(self.queue).await?;

        if let Some(highest) = self.highest {
            debug!("{} previous highest mutation is {}", self.queue, highest);
        }

        let ids = self.store.pending_ids(self.queue, self.highest).await?;

        if latest.is_some() {
            self.highest = latest;
        }

        let mut processed = 0;

        for id in ids {
            // Read again, an earlier mutation in this pass may have changed things.
            let mutation = self.store.get(self.queue, id).await?;

            if mutation.processed {
                continue;
            }

            let handled_by = self.dispatch(mutation).await?;

            match handled_by {
                Some(name) => debug!("{} mutation {} handled by {}", self.queue, id, name),
                None => error!(
                    "{} mutation {} has unknown code",
                    self.queue,
                    id.to_string().red()
                ),
            }

            self.store.mark_processed(self.queue, id).await?;
            processed += 1;
        }

        if processed > 0 {
            info!(
                "{} {} mutations processed ({:.3} ms), highest is now {}",
                self.queue.name().green(),
                processed,
                start.elapsed().as_secs_f64() * 1000.0,
                self.highest.unwrap_or_default()
            );
        }

        Ok(processed)
    }

    /// Process mutations until the run time is up.
    pub async fn run(&mut self, run_for: &RunFor) -> Result<(), Error> {
        let now = run_for::now();
        let deadline = Instant::now() + run_for.run_time(now);

        self.highest = None;
        self.mutation_count = 0;

        info!(
            "{} worker running until {}",
            self.queue.name().green(),
            run_for.stop_at(now)
        );

        loop {
            let count = self.store.count(self.queue).await?;

            if count != self.mutation_count {
                self.mutation_count = count;
                self.process_new().await?;
            } else {
                self.idle().await?;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());

            if remaining <= Duration::from_secs(1) {
                break;
            }

            if self
                .receiver
                .wait_for_ping(self.poll_timeout.min(remaining))
                .await?
            {
                self.pings += 1;
            }
        }

        info!(
            "{} worker stopped, {} pings received",
            self.queue.name().green(),
            self.pings
        );

        Ok(())
    }

    // Offer the mutation to the handlers. Runs in its own task so a panicking
    // handler doesn't take the worker down.
    async fn dispatch(&self, mutation: Mutation) -> Result<Option<&'static str>, Error> {
        let handlers = self.handlers.clone();
        let id = mutation.id()?;

        tokio::spawn(async move {
            for handler in handlers.iter() {
                match handler.handle(&mutation).await {
                    Ok(true) => return Ok(Some(handler.handler_name())),
                    Ok(false) => continue,
                    Err(err) => {
                        error!(
                            "{} mutation {} failed in {}: {}",
                            mutation.queue,
                            id,
                            handler.handler_name().purple(),
                            err
                        );

                        return Err(Error::Handler {
                            handler: handler.handler_name().to_string(),
                            id,
                            message: err.to_string(),
                        });
                    }
                }
            }

            Ok(None)
        })
        .await?
    }

    async fn idle(&self) -> Result<(), Error> {
        for handler in self.handlers.iter() {
            handler.idle().await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::queue::MemoryStore;
    use crate::sync::BackgroundSync;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default, Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<i64>>>,
        idle: Arc<AtomicUsize>,
        code: i32,
    }

    #[async_trait]
    impl MutationHandler for Recorder {
        async fn handle(&self, mutation: &Mutation) -> Result<bool, Error> {
            if mutation.code != self.code {
                return Ok(false);
            }

            self.seen.lock().push(mutation.id()?);
            Ok(true)
        }

        async fn idle(&self) -> Result<(), Error> {
            self.idle.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl MutationHandler for Failing {
        async fn handle(&self, mutation: &Mutation) -> Result<bool, Error> {
            if mutation.code == 13 {
                Err(Error::Unknown("bad luck".into()))
            } else {
                Ok(false)
            }
        }
    }

    struct FailOnce(AtomicBool);

    #[async_trait]
    impl MutationHandler for FailOnce {
        async fn handle(&self, _mutation: &Mutation) -> Result<bool, Error> {
            if self.0.swap(true, Ordering::SeqCst) {
                Ok(false)
            } else {
                Err(Error::Unknown("database went away".into()))
            }
        }
    }

    struct Panicking;

    #[async_trait]
    impl MutationHandler for Panicking {
        async fn handle(&self, _mutation: &Mutation) -> Result<bool, Error> {
            panic!("handler bug");
        }
    }

    fn recorder(code: i32) -> Recorder {
        Recorder {
            code,
            ..Default::default()
        }
    }

    async fn worker(queue: Queue) -> (Worker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let receiver = PingReceiver::bind("127.0.0.1:0").await.unwrap();

        (Worker::new(queue, store.clone(), receiver), store)
    }

    async fn insert(store: &MemoryStore, queue: Queue, code: i32) -> i64 {
        store
            .insert(Mutation::new(queue, code))
            .await
            .unwrap()
            .id()
            .unwrap()
    }

    #[tokio::test]
    async fn test_processes_in_order() {
        let recorder = recorder(1);
        let (worker, store) = worker(Queue::Bestel).await;
        let mut worker = worker.handler(recorder.clone());

        for _ in 0..3 {
            insert(&store, Queue::Bestel, 1).await;
        }

        assert_eq!(worker.process_new().await.unwrap(), 3);
        assert_eq!(*recorder.seen.lock(), vec![1, 2, 3]);
        assert_eq!(store.count_pending(Queue::Bestel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_first_handler_wins() {
        let first = recorder(1);
        let second = recorder(1);
        let other = recorder(2);
        let (worker, store) = worker(Queue::Competitie).await;
        let mut worker = worker
            .handler(other.clone())
            .handler(first.clone())
            .handler(second.clone());

        insert(&store, Queue::Competitie, 1).await;
        worker.process_new().await.unwrap();

        assert_eq!(*first.seen.lock(), vec![1]);
        assert!(second.seen.lock().is_empty());
        assert!(other.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_high_water_mark() {
        let recorder = recorder(1);
        let (worker, store) = worker(Queue::Betaal).await;
        let mut worker = worker
            .handler(FailOnce(AtomicBool::new(false)))
            .handler(recorder.clone());

        let first = insert(&store, Queue::Betaal, 1).await;
        assert!(worker.process_new().await.is_err());

        // The failed mutation is at or below the high-water mark now.
        let second = insert(&store, Queue::Betaal, 1).await;
        assert_eq!(worker.process_new().await.unwrap(), 1);
        assert_eq!(*recorder.seen.lock(), vec![second]);
        assert!(!store.get(Queue::Betaal, first).await.unwrap().processed);

        // A restarted worker picks it up again.
        worker.highest = None;
        assert_eq!(worker.process_new().await.unwrap(), 1);
        assert_eq!(*recorder.seen.lock(), vec![second, first]);
    }

    #[tokio::test]
    async fn test_unknown_code_is_marked() {
        let recorder = recorder(1);
        let (worker, store) = worker(Queue::Scheids).await;
        let mut worker = worker.handler(recorder.clone());

        let id = insert(&store, Queue::Scheids, 99).await;

        assert_eq!(worker.process_new().await.unwrap(), 1);
        assert!(recorder.seen.lock().is_empty());
        assert!(store.get(Queue::Scheids, id).await.unwrap().processed);
    }

    #[tokio::test]
    async fn test_skips_processed() {
        let recorder = recorder(1);
        let (worker, store) = worker(Queue::Bestel).await;
        let mut worker = worker.handler(recorder.clone());

        let a = insert(&store, Queue::Bestel, 1).await;
        let b = insert(&store, Queue::Bestel, 1).await;
        store.mark_processed(Queue::Bestel, a).await.unwrap();

        assert_eq!(worker.process_new().await.unwrap(), 1);
        assert_eq!(*recorder.seen.lock(), vec![b]);
    }

    #[tokio::test]
    async fn test_handler_error_stops_pass() {
        let recorder = recorder(1);
        let (worker, store) = worker(Queue::Bestel).await;
        let mut worker = worker.handler(Failing).handler(recorder.clone());

        let a = insert(&store, Queue::Bestel, 1).await;
        let failing = insert(&store, Queue::Bestel, 13).await;
        let c = insert(&store, Queue::Bestel, 1).await;

        let result = worker.process_new().await;
        assert!(matches!(result, Err(Error::Handler { id, .. }) if id == failing));

        assert!(store.get(Queue::Bestel, a).await.unwrap().processed);
        assert!(!store.get(Queue::Bestel, failing).await.unwrap().processed);
        assert!(!store.get(Queue::Bestel, c).await.unwrap().processed);
        assert_eq!(*recorder.seen.lock(), vec![a]);
    }

    #[tokio::test]
    async fn test_handler_panic() {
        let (worker, store) = worker(Queue::Bestel).await;
        let mut worker = worker.handler(Panicking);

        let id = insert(&store, Queue::Bestel, 1).await;

        assert!(matches!(
            worker.process_new().await,
            Err(Error::Worker(_))
        ));
        assert!(!store.get(Queue::Bestel, id).await.unwrap().processed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run() {
        let recorder = recorder(1);
        let (worker, store) = worker(Queue::Competitie).await;
        let mut worker = worker.handler(recorder.clone());

        insert(&store, Queue::Competitie, 1).await;
        insert(&store, Queue::Competitie, 1).await;

        let start = Instant::now();
        worker
            .run(&RunFor::new(7).unwrap().quick())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(*recorder.seen.lock(), vec![1, 2]);
        // First pass processed, the passes after that found nothing new.
        assert!(recorder.idle.load(Ordering::SeqCst) >= 1);
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed <= Duration::from_secs(7));
        assert_eq!(worker.pings(), 0);
    }

    #[tokio::test]
    async fn test_ping_wakes_worker() {
        let recorder = recorder(1);
        let store = Arc::new(MemoryStore::new());
        let receiver = PingReceiver::bind("127.0.0.1:0").await.unwrap();
        let sync = BackgroundSync::new(receiver.local_addr().unwrap());
        let mut worker = Worker::new(Queue::Bestel, store.clone(), receiver)
            .handler(recorder.clone())
            .poll_timeout(Duration::from_secs(30));

        let producer = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            producer.insert(Mutation::new(Queue::Bestel, 1)).await.unwrap();
            sync.ping().await.unwrap();
        });

        let start = std::time::Instant::now();
        worker
            .run(&RunFor::new(2).unwrap().quick())
            .await
            .unwrap();

        assert_eq!(*recorder.seen.lock(), vec![1]);
        assert!(worker.pings() >= 1);
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
