use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timeout exceeded")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl Error {
    /// Status code to answer with when a controller returns this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::MalformedRequest(_) | Self::Json(_) | Self::BadRequest(_) => 400,
            _ => 500,
        }
    }
}
