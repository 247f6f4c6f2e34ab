//! Write-ahead mutation queues with a UDP wake-up for the worker.
//!
//! Web requests that need to change shared state (register for a competition,
//! turn a basket into an order, record a payment) don't do it themselves. They write
//! a mutation to a queue table and ping the queue's worker. The worker is the only
//! process that applies mutations, one at a time and in order, so requests never race
//! each other.
//!
//! ### Producer
//!
//! ```rust,ignore
//! use mutaties::prelude::*;
//!
//! let store = Arc::new(PostgresStore::new(Pool::from_env()));
//! let sync = BackgroundSync::for_queue(Queue::Bestel, Config::get()).await?;
//! let queue = MutationQueue::new(Queue::Bestel, store, sync);
//!
//! let mutation = Mutation::new(Queue::Bestel, 1)
//!     .payload(json!({"inschrijving": 123}))?
//!     .door("Sporter 100001");
//!
//! // Waits up to 3 seconds for the worker.
//! let mutation = queue.submit(mutation, false).await?;
//! ```
//!
//! ### Worker
//!
//! ```rust,ignore
//! let receiver = PingReceiver::for_queue(Queue::Bestel, Config::get()).await?;
//! let mut worker = Worker::new(Queue::Bestel, store, receiver).handler(Orders);
//!
//! worker.run(&RunFor::new(60)?.margin(Queue::Bestel.overlap_margin())).await?;
//! ```
//!
//! ### Test doubles
//!
//! [`websim`] has two small HTTP servers standing in for the pass download and mail
//! provider APIs.
pub mod colors;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod prelude;
pub mod queue;
pub mod sync;
pub mod websim;

pub use async_trait::async_trait;
pub use error::Error;
