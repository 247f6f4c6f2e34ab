//! Mutation store backed by Postgres.
//!
//! Producers (web requests) and the worker are separate processes; the table is the
//! only thing they share. Create the tables with [`crate::model::Migrations`].
use async_trait::async_trait;

use super::{Error, Mutation, MutationStore, Queue};
use crate::model::Pool;

const COLUMNS: &str = "id, code, payload, door, is_verwerkt, created_at";

/// Mutations in Postgres tables, one table per queue.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl MutationStore for PostgresStore {
    async fn insert(&self, mutation: Mutation) -> Result<Mutation, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!(
            "INSERT INTO {} (code, payload, door, is_verwerkt, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            mutation.queue.table_name(),
            COLUMNS
        );

        let rows = conn
            .query_cached(
                &query,
                &[
                    &mutation.code,
                    &mutation.payload,
                    &mutation.door,
                    &mutation.processed,
                    &mutation.created_at,
                ],
            )
            .await?;

        match rows.into_iter().next() {
            Some(row) => Mutation::from_row(mutation.queue, row),
            None => Err(crate::model::Error::RecordNotFound.into()),
        }
    }

    async fn get(&self, queue: Queue, id: i64) -> Result<Mutation, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM {} WHERE id = $1",
            COLUMNS,
            queue.table_name()
        );

        match conn.query_cached(&query, &[&id]).await?.into_iter().next() {
            Some(row) => Mutation::from_row(queue, row),
            None => Err(Error::NotFound(id)),
        }
    }

    async fn find_pending(&self, mutation: &Mutation) -> Result<Option<Mutation>, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!(
            "SELECT {} FROM {} WHERE code = $1 AND payload = $2 AND NOT is_verwerkt \
             ORDER BY id ASC LIMIT 1",
            COLUMNS,
            mutation.queue.table_name()
        );

        match conn
            .query_cached(&query, &[&mutation.code, &mutation.payload])
            .await?
            .into_iter()
            .next()
        {
            Some(row) => Ok(Some(Mutation::from_row(mutation.queue, row)?)),
            None => Ok(None),
        }
    }

    async fn count(&self, queue: Queue) -> Result<i64, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!("SELECT COUNT(*) AS count FROM {}", queue.table_name());

        count(conn.query_cached(&query, &[]).await?)
    }

    async fn latest_id(&self, queue: Queue) -> Result<Option<i64>, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!("SELECT MAX(id) AS id FROM {}", queue.table_name());

        match conn.query_cached(&query, &[]).await?.into_iter().next() {
            Some(row) => Ok(row.try_get("id")?),
            None => Ok(None),
        }
    }

    async fn pending_ids(&self, queue: Queue, after: Option<i64>) -> Result<Vec<i64>, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!(
            "SELECT id FROM {} WHERE NOT is_verwerkt AND id > $1 ORDER BY id ASC",
            queue.table_name()
        );
        let after = after.unwrap_or(0);

        conn.query_cached(&query, &[&after])
            .await?
            .into_iter()
            .map(|row| Ok(row.try_get::<_, i64>("id")?))
            .collect()
    }

    async fn mark_processed(&self, queue: Queue, id: i64) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;
        let query = format!(
            "UPDATE {} SET is_verwerkt = true WHERE id = $1 RETURNING id",
            queue.table_name()
        );

        if conn.query_cached(&query, &[&id]).await?.is_empty() {
            Err(Error::NotFound(id))
        } else {
            Ok(())
        }
    }

    async fn count_pending(&self, queue: Queue) -> Result<i64, Error> {
        let mut conn = self.pool.get().await?;
        let query = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE NOT is_verwerkt",
            queue.table_name()
        );

        count(conn.query_cached(&query, &[]).await?)
    }
}

fn count(rows: Vec<tokio_postgres::Row>) -> Result<i64, Error> {
    match rows.into_iter().next() {
        Some(row) => Ok(row.try_get("count")?),
        None => Ok(0),
    }
}
