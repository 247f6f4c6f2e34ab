//! Request line and headers.
use std::marker::Unpin;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{Error, Headers};
use crate::config::get_config;

/// HTTP method, e.g. GET, POST, etc.
#[derive(PartialEq, Clone, Debug, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    /// Some other request we don't have a name for.
    Other(String),
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "PATCH" => Method::Patch,
            _ => Method::Other(value.to_string()),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Method::*;

        let name = match self {
            Get => "GET",
            Post => "POST",
            Put => "PUT",
            Delete => "DELETE",
            Head => "HEAD",
            Patch => "PATCH",
            Other(other) => other.as_str(),
        };

        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Version {
    #[default]
    Http1,
    /// HTTP/1.0, closes the connection after every response.
    Http10,
    Unknown,
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        match value {
            "HTTP/1.1" => Version::Http1,
            "HTTP/1.0" => Version::Http10,
            _ => Version::Unknown,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Version::Http1 => write!(f, "HTTP/1.1"),
            Version::Http10 => write!(f, "HTTP/1.0"),
            Version::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Request method, path, HTTP version and headers.
#[derive(Debug, Clone, Default)]
pub struct Head {
    method: Method,
    path: String,
    version: Version,
    headers: Headers,
}

impl Head {
    /// Read the request head from a stream.
    ///
    /// The whole head may not be larger than `general.header_max_size`.
    pub async fn read(mut stream: impl AsyncRead + Unpin) -> Result<Self, Error> {
        let mut bytes_remaining = get_config().general.header_max_size;

        let request = Self::read_line(&mut stream, &mut bytes_remaining).await?;
        let mut request = request.split(' ');

        let method = request.next().ok_or(Error::MalformedRequest("method"))?;
        if method.is_empty() {
            return Err(Error::MalformedRequest("method"));
        }
        let method = Method::from(method);

        let path = request
            .next()
            .ok_or(Error::MalformedRequest("path"))?
            .to_string();

        let version = Version::from(request.next().ok_or(Error::MalformedRequest("version"))?);

        let mut headers = Headers::new();

        loop {
            let header = Self::read_line(&mut stream, &mut bytes_remaining).await?;

            if header.is_empty() {
                break;
            }

            let (name, value) = header
                .split_once(':')
                .ok_or(Error::MalformedRequest("header"))?;
            headers.insert(name.trim(), value.trim());
        }

        Ok(Head {
            method,
            path,
            version,
            headers,
        })
    }

    /// Path without the query string, e.g. `/bondspas/100001`.
    pub fn path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn post(&self) -> bool {
        self.method == Method::Post
    }

    pub fn get(&self) -> bool {
        self.method == Method::Get
    }

    /// Size of the body according to `Content-Length`.
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get("content-length")
            .and_then(|cl| cl.parse::<usize>().ok())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a header value by name. Case insensitive.
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// Should the connection stay open after the response?
    ///
    /// HTTP/1.1 connections are kept alive unless the client says otherwise.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers.get("connection").map(|s| s.to_lowercase());

        match self.version {
            Version::Http1 => connection.map(|c| !c.contains("close")).unwrap_or(true),
            _ => connection.map(|c| c.contains("keep-alive")).unwrap_or(false),
        }
    }

    /// Read a line from the stream, without the \r\n.
    async fn read_line(
        mut stream: impl AsyncRead + Unpin,
        bytes_remaining: &mut usize,
    ) -> Result<String, Error> {
        let mut buf = Vec::new();
        let mut cr = false;

        loop {
            if *bytes_remaining == 0 {
                return Err(Error::MalformedRequest("head too large"));
            }

            // `stream` should be buffered.
            let b = stream.read_u8().await?;
            *bytes_remaining -= 1;

            match b {
                b'\r' => cr = true,
                b'\n' if cr => break,
                b'\n' => return Err(Error::MalformedRequest("nl before cr")),
                _ => buf.push(b),
            }
        }

        Ok(String::from_utf8_lossy(&buf).to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_read_line() {
        let line = b"Content-Type: application/json\r\n";
        let result = Head::read_line(&line[..], &mut 4096).await.unwrap();
        assert_eq!(result, "Content-Type: application/json");
    }

    #[tokio::test]
    async fn test_parse_head() {
        let body = ("POST /v3/mg.example.com/messages?x=1 HTTP/1.1\r\n".to_owned()
            + "Host: 127.0.0.1:8123\r\n"
            + "Content-Type: application/x-www-form-urlencoded\r\n"
            + "Content-Length: 4\r\n"
            + "\r\n"
            + "to=x")
            .as_bytes()
            .to_vec();
        let head = Head::read(&body[..]).await.unwrap();

        assert_eq!(head.method(), &Method::Post);
        assert!(head.post());
        assert_eq!(head.path(), "/v3/mg.example.com/messages");
        assert_eq!(head.version(), &Version::Http1);
        assert_eq!(head.content_length(), Some(4));
        assert_eq!(head.header("HOST"), Some(&String::from("127.0.0.1:8123")));
        assert!(head.keep_alive());
    }

    #[tokio::test]
    async fn test_connection_close() {
        let head = Head::read("GET / HTTP/1.1\r\nConnection: close\r\n\r\n".as_bytes())
            .await
            .unwrap();
        assert!(!head.keep_alive());

        let head = Head::read("GET / HTTP/1.0\r\n\r\n".as_bytes())
            .await
            .unwrap();
        assert!(!head.keep_alive());
    }

    #[tokio::test]
    async fn test_nl_before_cr() {
        let err = Head::read("GET / HTTP/1.1\n\r".as_bytes())
            .await
            .expect_err("parser should throw err");

        assert!(err.to_string().contains("nl before cr"));
    }

    #[tokio::test]
    async fn test_bare_nl_rejected_early() {
        let mut request = "GET / HTTP/1.1\nHost: 127.0.0.1\n".to_string();
        request.push_str(&"a".repeat(32 * 1024));

        let mut budget = 16 * 1024;
        let err = Head::read_line(request.as_bytes(), &mut budget)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MalformedRequest("nl before cr")));
        assert_eq!(budget, 16 * 1024 - "GET / HTTP/1.1\n".len());
    }

    #[tokio::test]
    async fn test_head_too_large() {
        let mut request = "GET / HTTP/1.1\r\n".to_string();
        for i in 0..2048 {
            request.push_str(&format!("X-Header-{}: {}\r\n", i, "a".repeat(16)));
        }
        request.push_str("\r\n");

        let err = Head::read(request.as_bytes()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedRequest("head too large")));
    }
}
