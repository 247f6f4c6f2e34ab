//! Global error type.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(#[from] crate::config::Error),

    #[error("{0}")]
    Database(#[from] crate::model::Error),

    #[error("{0}")]
    Sync(#[from] crate::sync::Error),

    #[error("{0}")]
    Queue(#[from] crate::queue::Error),

    #[error("{0}")]
    Http(#[from] crate::http::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
