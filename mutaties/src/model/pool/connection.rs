//! One Postgres connection with a prepared statement cache.
//!
//! Queue stores build their SQL per table, so the same handful of statements
//! is executed over and over on each connection. Each is prepared once.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::tls::NoTls;
use tokio_postgres::{types::ToSql, Client, Row, Statement};
use tracing::{debug, error};

use super::Error;
use crate::config::get_config;

#[derive(Debug)]
pub struct Connection {
    client: Client,
    statements: HashMap<String, Statement>,
    broken: Arc<AtomicBool>,
    driver: JoinHandle<()>,
    last_used: Instant,
}

impl Connection {
    /// Connect to the database at `database_url`.
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;
        let broken = Arc::new(AtomicBool::new(false));

        let driver = tokio::spawn({
            let broken = broken.clone();

            async move {
                if let Err(err) = connection.await {
                    error!("postgres connection closed: {}", err);
                    broken.store(true, Ordering::Relaxed);
                }
            }
        });

        Ok(Self {
            client,
            statements: HashMap::new(),
            broken,
            driver,
            last_used: Instant::now(),
        })
    }

    /// Run a statement, preparing it on first use.
    pub async fn query_cached(
        &mut self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Error> {
        if get_config().general.log_queries {
            debug!("{}", query);
        }

        let statement = match self.statements.get(query) {
            Some(statement) => statement.clone(),
            None => {
                let statement = self.client.prepare(query).await?;
                self.statements.insert(query.to_string(), statement.clone());
                statement
            }
        };

        self.client.query(&statement, params).await.map_err(|err| {
            // "cached plan must not change result type": the table changed under a
            // prepared statement. Throw away the connection and its cache.
            if err.code() == Some(&SqlState::FEATURE_NOT_SUPPORTED) {
                self.broken.store(true, Ordering::Relaxed);
            }

            Error::DatabaseError(err)
        })
    }

    /// Run one or more statements without parameters, e.g. DDL.
    pub async fn batch_execute(&self, query: &str) -> Result<(), Error> {
        Ok(self.client.batch_execute(query).await?)
    }

    /// The connection shouldn't be handed out again.
    pub fn bad(&self) -> bool {
        self.broken.load(Ordering::Relaxed) || self.client.is_closed()
    }

    /// Number of prepared statements.
    pub fn prepared(&self) -> usize {
        self.statements.len()
    }

    pub(super) fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    pub(super) fn idle_for(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.last_used)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
