//! Errors returned by the database layer.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0:?}")]
    DatabaseError(#[from] tokio_postgres::Error),

    #[error("pool timeout")]
    PoolTimeout,

    #[error("record not found")]
    RecordNotFound,

    #[error("migration error: \"{0}\"")]
    MigrationError(String),
}
