//! Postgres connection pool.
//!
//! Producers and workers check out a connection for every store operation with
//! [`Pool::get`]; it goes back into the pool when the [`ConnectionGuard`] is dropped.
//! The most recently used connection is handed out first, so under light load the
//! same one or two connections are reused and the rest time out.
//!
//! If no connection is free and the pool is full, callers wait for a checkin, up to
//! the checkout timeout.
//!
//! ```ignore
//! let pool = Pool::from_env();
//! let mut conn = pool.get().await?;
//! let rows = conn.query_cached("SELECT 1", &[]).await?;
//! ```
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{interval, timeout, Duration};
use tracing::debug;

use super::Error;
use crate::config::get_config;

pub mod connection;

pub use connection::Connection;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of open connections.
    pub pool_size: usize,
    /// How long [`Pool::get`] waits for a connection.
    pub checkout_timeout: Duration,
    /// Connections unused for longer than this are closed.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 10,
            checkout_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
        }
    }
}

/// Open and idle connection counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Connections open, idle or checked out.
    pub open: usize,
    /// Connections waiting in the pool.
    pub idle: usize,
}

#[derive(Debug, Default)]
struct Slots {
    idle: Vec<Connection>,
    open: usize,
}

#[derive(Debug)]
struct Shared {
    slots: Mutex<Slots>,
    checkin: Notify,
    database_url: String,
    config: PoolConfig,
}

/// Connection pool. Clones share the same connections.
#[derive(Debug, Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

impl Pool {
    /// Create a pool. Must be called from inside a Tokio runtime: idle connections
    /// are closed by a background task, which stops when the last clone is dropped.
    pub fn new(database_url: &str, config: PoolConfig) -> Self {
        let shared = Arc::new(Shared {
            slots: Mutex::new(Slots::default()),
            checkin: Notify::new(),
            database_url: database_url.to_string(),
            config,
        });

        tokio::spawn(Self::maintenance(Arc::downgrade(&shared)));

        Self { shared }
    }

    /// Create a pool with the `[database]` settings of the global configuration.
    pub fn from_env() -> Self {
        let database = &get_config().database;

        Self::new(
            &database.database_url(),
            PoolConfig {
                pool_size: database.pool_size,
                idle_timeout: database.idle_timeout,
                checkout_timeout: database.checkout_timeout,
            },
        )
    }

    /// Check out a connection, opening one if the pool isn't full yet.
    pub async fn get(&self) -> Result<ConnectionGuard, Error> {
        timeout(self.shared.config.checkout_timeout, self.checkout())
            .await
            .map_err(|_| Error::PoolTimeout)?
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.shared.slots.lock();

        PoolStats {
            open: slots.open,
            idle: slots.idle.len(),
        }
    }

    async fn checkout(&self) -> Result<ConnectionGuard, Error> {
        loop {
            let open_new = {
                let mut slots = self.shared.slots.lock();

                while let Some(connection) = slots.idle.pop() {
                    if connection.bad() {
                        slots.open -= 1;
                    } else {
                        return Ok(ConnectionGuard::new(connection, self.clone()));
                    }
                }

                let open_new = slots.open < self.shared.config.pool_size;
                if open_new {
                    slots.open += 1;
                }
                open_new
            };

            if open_new {
                return match Connection::new(&self.shared.database_url).await {
                    Ok(connection) => Ok(ConnectionGuard::new(connection, self.clone())),
                    Err(err) => {
                        self.shared.slots.lock().open -= 1;
                        Err(err)
                    }
                };
            }

            self.shared.checkin.notified().await;
        }
    }

    fn checkin(&self, mut connection: Connection) {
        {
            let mut slots = self.shared.slots.lock();

            if connection.bad() {
                slots.open -= 1;
            } else {
                connection.touch();
                slots.idle.push(connection);
            }
        }

        self.shared.checkin.notify_one();
    }

    async fn maintenance(shared: Weak<Shared>) {
        let mut ticks = interval(Duration::from_secs(1));

        loop {
            ticks.tick().await;

            let Some(shared) = shared.upgrade() else {
                break;
            };

            let now = Instant::now();
            let idle_timeout = shared.config.idle_timeout;
            let mut slots = shared.slots.lock();
            let before = slots.idle.len();

            slots
                .idle
                .retain(|connection| !connection.bad() && connection.idle_for(now) <= idle_timeout);

            let closed = before - slots.idle.len();
            if closed > 0 {
                slots.open -= closed;
                debug!("closed {} idle connections", closed);
            }
        }
    }
}

/// Checked out connection. Goes back into the pool when dropped.
pub struct ConnectionGuard {
    connection: Option<Connection>,
    pool: Pool,
}

impl ConnectionGuard {
    fn new(connection: Connection, pool: Pool) -> Self {
        Self {
            connection: Some(connection),
            pool,
        }
    }
}

impl Deref for ConnectionGuard {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        // Only taken in drop.
        self.connection.as_ref().expect("connection checked in")
    }
}

impl DerefMut for ConnectionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut().expect("connection checked in")
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.checkin(connection);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_connect_error_frees_slot() {
        // Nothing listens on the discard port.
        let pool = Pool::new(
            "postgresql://nobody@127.0.0.1:9/nothing",
            PoolConfig {
                pool_size: 1,
                checkout_timeout: Duration::from_secs(2),
                idle_timeout: Duration::from_secs(1),
            },
        );

        assert!(pool.get().await.is_err());
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres"]
    async fn test_pool() -> Result<(), Error> {
        let pool = Pool::from_env();
        let mut conn = pool.get().await?;
        let rows = conn.query_cached("SELECT 1", &[]).await?;

        assert_eq!(rows.len(), 1);
        assert_eq!(conn.prepared(), 1);
        assert_eq!(pool.stats(), PoolStats { open: 1, idle: 0 });

        drop(conn);
        assert_eq!(pool.stats(), PoolStats { open: 1, idle: 1 });

        // Same connection again, statement still prepared.
        let conn = pool.get().await?;
        assert_eq!(conn.prepared(), 1);
        assert_eq!(pool.stats(), PoolStats { open: 1, idle: 0 });

        Ok(())
    }
}
