//! Mutation queues.
//!
//! A web request that wants something done without racing other requests writes a
//! mutation row and pings the worker. The worker owns the queue: it applies mutations
//! one at a time, in the order they were created, and marks each one processed. The
//! producer can wait a little while for that to happen, see
//! [`MutationQueue::ping_background_task`].
//!
//! Storage is behind the [`MutationStore`] trait: Postgres in production,
//! [`MemoryStore`] for tests.
pub mod backoff;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod producer;
pub mod run_for;
pub mod store;
pub mod worker;

pub use backoff::Backoff;
pub use error::Error;
pub use memory::MemoryStore;
pub use model::{Mutation, Queue};
pub use postgres::PostgresStore;
pub use producer::MutationQueue;
pub use run_for::RunFor;
pub use store::MutationStore;
pub use worker::{MutationHandler, Worker};
