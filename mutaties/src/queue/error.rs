//! Errors returned by the mutation queues.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Couldn't (de)serialize the payload.
    #[error("mutation serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The database returned an error.
    #[error("mutation database error: {0}")]
    Database(#[from] crate::model::Error),

    /// Pinging or listening for pings failed.
    #[error("{0}")]
    Sync(#[from] crate::sync::Error),

    /// The mutation hasn't been written to the queue yet.
    #[error("mutation is not saved")]
    NotSaved,

    /// The mutation doesn't exist (anymore).
    #[error("mutation {0} not found")]
    NotFound(i64),

    /// A handler failed to apply the mutation.
    #[error("handler {handler} failed on mutation {id}: {message}")]
    Handler {
        handler: String,
        id: i64,
        message: String,
    },

    /// A handler panicked.
    #[error("tokio error: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Worker duration isn't one of the supported values.
    #[error("duration {0} is not supported, use one of 1, 2, 5, 7, 10, 15, 20, 30, 45, 60")]
    Duration(u32),

    /// The stop minute is not in 0..60.
    #[error("stop minute {0} is not valid")]
    StopMinute(u8),

    /// Queue name not recognized.
    #[error("unknown queue \"{0}\"")]
    UnknownQueue(String),

    /// Something went wrong in a handler and it didn't say what.
    #[error("mutation error: {0}")]
    Unknown(String),
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Error {
        Error::Database(err.into())
    }
}
