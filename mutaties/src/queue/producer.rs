//! Producer side of a mutation queue.
//!
//! Web requests write mutations and nudge the worker. They may wait a short while for
//! the worker to catch up, so the page they render already shows the effect.
//!
//! ```ignore
//! let queue = MutationQueue::new(Queue::Bestel, store, sync);
//! let mutation = queue
//!     .submit(Mutation::new(Queue::Bestel, 1).payload(json!({"product": 7}))?, false)
//!     .await?;
//!
//! if !mutation.processed {
//!     // Worker is busy or not running, tell the user it'll be done shortly.
//! }
//! ```
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Backoff, Error, Mutation, MutationStore, Queue};
use crate::sync::BackgroundSync;

/// Writes mutations to one queue and pings its worker.
pub struct MutationQueue {
    queue: Queue,
    store: Arc<dyn MutationStore>,
    sync: BackgroundSync,
    backoff: Backoff,
}

impl std::fmt::Debug for MutationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationQueue")
            .field("queue", &self.queue)
            .field("sync", &self.sync)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl MutationQueue {
    pub fn new(queue: Queue, store: Arc<dyn MutationStore>, sync: BackgroundSync) -> Self {
        Self {
            queue,
            store,
            sync,
            backoff: Backoff::default(),
        }
    }

    /// Use a different wait schedule.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn queue(&self) -> Queue {
        self.queue
    }

    /// Write the mutation. Every call adds a row, even if an identical
    /// mutation is already waiting.
    pub async fn create(&self, mutation: Mutation) -> Result<Mutation, Error> {
        let mutation = self.store.insert(self.own(mutation)).await?;

        debug!(
            "{} mutation {} created (code {}, door \"{}\")",
            self.queue,
            mutation.id()?,
            mutation.code,
            mutation.door
        );

        Ok(mutation)
    }

    /// Reuse a pending mutation with the same code and payload, or write a new one.
    /// Returns `true` if a row was inserted.
    ///
    /// Two producers racing each other can still both insert.
    pub async fn get_or_create(&self, mutation: Mutation) -> Result<(Mutation, bool), Error> {
        let mutation = self.own(mutation);

        match self.store.find_pending(&mutation).await? {
            Some(existing) => Ok((existing, false)),
            None => Ok((self.create(mutation).await?, true)),
        }
    }

    /// Wake up the worker and, unless `fast` is set, wait for it to process the mutation.
    ///
    /// The returned mutation is the last version read from the store. Check
    /// [`Mutation::processed`] to see if the worker got to it in time; running out of
    /// time is not an error.
    pub async fn ping_background_task(
        &self,
        mutation: &Mutation,
        fast: bool,
    ) -> Result<Mutation, Error> {
        if let Err(err) = self.sync.ping().await {
            warn!("{} worker not pinged: {}", self.queue, err);
        }

        let mut mutation = mutation.clone();

        if fast {
            return Ok(mutation);
        }

        let id = mutation.id()?;

        for interval in self.backoff.intervals() {
            if mutation.processed {
                break;
            }

            sleep(interval).await;
            mutation = self.store.get(self.queue, id).await?;
        }

        if !mutation.processed {
            debug!(
                "{} mutation {} not processed within {:.1}s",
                self.queue,
                id,
                self.backoff.budget().as_secs_f64()
            );
        }

        Ok(mutation)
    }

    /// Write the mutation and ping the worker.
    pub async fn submit(&self, mutation: Mutation, fast: bool) -> Result<Mutation, Error> {
        let mutation = self.create(mutation).await?;
        self.ping_background_task(&mutation, fast).await
    }

    fn own(&self, mut mutation: Mutation) -> Mutation {
        mutation.queue = self.queue;
        mutation
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::queue::MemoryStore;
    use crate::sync::PingReceiver;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    async fn setup(queue: Queue) -> (MutationQueue, Arc<MemoryStore>, PingReceiver) {
        let receiver = PingReceiver::bind("127.0.0.1:0").await.unwrap();
        let store = Arc::new(MemoryStore::new());
        let sync = BackgroundSync::new(receiver.local_addr().unwrap());

        (
            MutationQueue::new(queue, store.clone(), sync),
            store,
            receiver,
        )
    }

    fn mutation(code: i32) -> Mutation {
        Mutation::new(Queue::Bestel, code)
            .payload(json!({"inschrijving": 12}))
            .unwrap()
            .door("Sporter 100001")
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_returns_immediately() {
        let (queue, _store, _receiver) = setup(Queue::Bestel).await;
        let created = queue.create(mutation(1)).await.unwrap();

        let start = Instant::now();
        let mutation = queue.ping_background_task(&created, true).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!mutation.processed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processed_during_first_interval() {
        let (queue, store, _receiver) = setup(Queue::Bestel).await;
        let created = queue.create(mutation(1)).await.unwrap();
        let id = created.id().unwrap();

        let worker = store.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            worker.mark_processed(Queue::Bestel, id).await.unwrap();
        });

        let start = Instant::now();
        let mutation = queue.ping_background_task(&created, false).await.unwrap();
        let elapsed = start.elapsed();

        assert!(mutation.processed);
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let (queue, _store, _receiver) = setup(Queue::Betaal).await;
        let created = queue
            .create(Mutation::new(Queue::Betaal, 3))
            .await
            .unwrap();

        let start = Instant::now();
        let mutation = queue.ping_background_task(&created, false).await.unwrap();
        let elapsed = start.elapsed();

        assert!(!mutation.processed);
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_backoff() {
        let (queue, _store, _receiver) = setup(Queue::Scheids).await;
        let queue = queue.backoff(Backoff::new(
            Duration::from_millis(100),
            Duration::from_millis(700),
        ));
        let created = queue.create(Mutation::new(Queue::Scheids, 1)).await.unwrap();

        let start = Instant::now();
        queue.ping_background_task(&created, false).await.unwrap();
        let elapsed = start.elapsed();

        // 100 + 200 + 400
        assert!(elapsed >= Duration::from_millis(700));
        assert!(elapsed < Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_create_always_inserts() {
        let (queue, store, _receiver) = setup(Queue::Bestel).await;

        let a = queue.create(mutation(1)).await.unwrap();
        let b = queue.create(mutation(1)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(b.id > a.id);
        assert_eq!(store.count(Queue::Bestel).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_or_create() {
        let (queue, store, _receiver) = setup(Queue::Bestel).await;

        let (first, created) = queue.get_or_create(mutation(1)).await.unwrap();
        assert!(created);

        let (again, created) = queue.get_or_create(mutation(1)).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);

        // Different code is a different mutation.
        let (_, created) = queue.get_or_create(mutation(2)).await.unwrap();
        assert!(created);

        // Once processed, a new one is needed.
        store
            .mark_processed(Queue::Bestel, first.id().unwrap())
            .await
            .unwrap();
        let (next, created) = queue.get_or_create(mutation(1)).await.unwrap();
        assert!(created);
        assert_ne!(next.id, first.id);
    }

    #[tokio::test]
    async fn test_submit_pings_worker() {
        let (queue, _store, receiver) = setup(Queue::Competitie).await;

        let mutation = queue
            .submit(Mutation::new(Queue::Bestel, 1), true)
            .await
            .unwrap();

        // Queue is taken from the producer.
        assert_eq!(mutation.queue, Queue::Competitie);
        assert!(receiver
            .wait_for_ping(Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unsaved_mutation() {
        let (queue, _store, _receiver) = setup(Queue::Bestel).await;
        let result = queue
            .ping_background_task(&Mutation::new(Queue::Bestel, 1), false)
            .await;

        assert!(matches!(result, Err(Error::NotSaved)));
    }
}
