//! HTTP request.
use std::marker::Unpin;
use std::ops::Deref;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{Error, Head};

/// Largest body accepted. The simulators only receive small form posts.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// HTTP request, loaded into memory in full.
///
/// Cheap to clone, the body is behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Request {
    head: Head,
    body: Arc<Vec<u8>>,
}

impl Request {
    /// Read the head and the body from a stream.
    pub async fn read(mut stream: impl AsyncRead + Unpin) -> Result<Self, Error> {
        let head = Head::read(&mut stream).await?;
        let content_length = head.content_length().unwrap_or(0);

        if content_length > MAX_BODY_SIZE {
            return Err(Error::MalformedRequest("body too large"));
        }

        let mut body = vec![0u8; content_length];
        stream
            .read_exact(&mut body)
            .await
            .map_err(|_| Error::MalformedRequest("incorrect content length"))?;

        Ok(Request {
            head,
            body: Arc::new(body),
        })
    }

    /// Body as bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as a UTF-8 string. Invalid characters are replaced.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(self.body()).to_string()
    }
}

impl Deref for Request {
    type Target = Head;

    fn deref(&self) -> &Self::Target {
        &self.head
    }
}
