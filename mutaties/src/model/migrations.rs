//! Queue tables.
//!
//! Every queue has its own table. Statements are idempotent, so running
//! the migrations on every worker start is safe.
use tracing::info;

use super::{Error, Pool};
use crate::colors::MaybeColorize;
use crate::queue::Queue;

/// Schema of a single queue table.
pub fn table_sql(queue: Queue) -> String {
    let table = queue.table_name();

    format!(
        r#"CREATE TABLE IF NOT EXISTS {table} (
    id BIGSERIAL PRIMARY KEY,
    code INTEGER NOT NULL,
    payload JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    door VARCHAR(50) NOT NULL DEFAULT '',
    is_verwerkt BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS {table}_pending_idx ON {table} (id) WHERE NOT is_verwerkt;"#
    )
}

pub struct Migrations;

impl Migrations {
    /// Create the tables for all queues.
    pub async fn migrate(pool: &Pool) -> Result<(), Error> {
        let conn = pool.get().await?;

        for queue in Queue::all() {
            conn.batch_execute(&table_sql(queue))
                .await
                .map_err(|err| Error::MigrationError(format!("{}: {}", queue, err)))?;
            info!("table {} is ready", queue.table_name().green());
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_sql() {
        let sql = table_sql(Queue::Bestel);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS bestel_mutatie ("));
        assert!(sql.contains("is_verwerkt BOOLEAN NOT NULL DEFAULT false"));
        assert!(sql.contains("'{}'::jsonb"));
        assert!(sql.contains("bestel_mutatie_pending_idx"));
    }
}
