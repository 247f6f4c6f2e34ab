//! Where mutations are kept.
use async_trait::async_trait;

use super::{Error, Mutation, Queue};

/// Storage for all mutation queues.
///
/// Implementations only need to provide plain row operations; ordering,
/// waiting and dispatch are done by [`super::MutationQueue`] and [`super::Worker`].
#[async_trait]
pub trait MutationStore: Send + Sync {
    /// Write a new mutation and return it with its id set.
    async fn insert(&self, mutation: Mutation) -> Result<Mutation, Error>;

    /// Read a mutation by id.
    async fn get(&self, queue: Queue, id: i64) -> Result<Mutation, Error>;

    /// Oldest unprocessed mutation with the same code and payload, if any.
    async fn find_pending(&self, mutation: &Mutation) -> Result<Option<Mutation>, Error>;

    /// Number of rows in the queue, processed or not.
    async fn count(&self, queue: Queue) -> Result<i64, Error>;

    /// Highest id in the queue.
    async fn latest_id(&self, queue: Queue) -> Result<Option<i64>, Error>;

    /// Ids of unprocessed mutations, oldest first. If `after` is set, only
    /// ids greater than it.
    async fn pending_ids(&self, queue: Queue, after: Option<i64>) -> Result<Vec<i64>, Error>;

    /// Set the processed flag.
    async fn mark_processed(&self, queue: Queue, id: i64) -> Result<(), Error>;

    /// Number of unprocessed mutations.
    async fn count_pending(&self, queue: Queue) -> Result<i64, Error>;
}
