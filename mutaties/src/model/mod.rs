//! Postgres access: connection pool and the queue tables.
pub mod error;
pub mod migrations;
pub mod pool;

pub use error::Error;
pub use migrations::Migrations;
pub use pool::{Connection, ConnectionGuard, Pool, PoolConfig, PoolStats};
