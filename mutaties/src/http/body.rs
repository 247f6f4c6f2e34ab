//! Response body.
//!
//! The `Content-Type` and `Content-Length` headers are set from the body.
use std::marker::Unpin;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// UTF-8 encoded text.
    Text(String),
    /// Serialized JSON.
    Json(Vec<u8>),
    /// A PDF document.
    Pdf(Vec<u8>),
}

impl Body {
    /// Write the body to the stream. The stream is not flushed.
    pub async fn send(&self, mut stream: impl AsyncWrite + Unpin) -> Result<(), std::io::Error> {
        stream.write_all(self.as_bytes()).await
    }

    pub fn as_bytes(&self) -> &[u8] {
        use Body::*;

        match self {
            Text(text) => text.as_bytes(),
            Json(bytes) | Pdf(bytes) => bytes,
        }
    }

    /// Size in bytes, for `Content-Length`.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mime_type(&self) -> &'static str {
        use Body::*;

        match self {
            Text(_) => "text/plain; charset=utf-8",
            Json(_) => "application/json",
            Pdf(_) => "application/pdf",
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
