//! Everything needed to produce and process mutations.
pub use crate::async_trait;
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::logging::Logger;
pub use crate::model::{Migrations, Pool};
pub use crate::queue::{
    Backoff, MemoryStore, Mutation, MutationHandler, MutationQueue, MutationStore,
    PostgresStore, Queue, RunFor, Worker,
};
pub use crate::sync::{BackgroundSync, PingReceiver};

pub use serde_json::json;
pub use std::sync::Arc;
