//! HTTP response.
use serde::Serialize;
use std::marker::Unpin;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{head::Version, Body, Headers};

/// Response status, e.g. 404, 200, etc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    Ok,
    Created,
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    UnprocessableEntity,
    InternalServerError,
    Code(u16),
}

impl Status {
    pub fn code(&self) -> u16 {
        use Status::*;

        match self {
            Ok => 200,
            Created => 201,
            BadRequest => 400,
            Unauthorized => 401,
            NotFound => 404,
            MethodNotAllowed => 405,
            UnprocessableEntity => 422,
            InternalServerError => 500,
            Code(code) => *code,
        }
    }

    /// Reason phrase for the status line.
    pub fn reason(&self) -> &'static str {
        use Status::*;

        match self {
            Ok => "OK",
            Created => "Created",
            BadRequest => "Bad Request",
            Unauthorized => "Unauthorized",
            NotFound => "Not Found",
            MethodNotAllowed => "Method Not Allowed",
            UnprocessableEntity => "Unprocessable Entity",
            InternalServerError => "Internal Server Error",
            Code(_) => "",
        }
    }

    pub fn ok(&self) -> bool {
        self.code() < 300
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Status {
        use Status::*;

        match code {
            200 => Ok,
            201 => Created,
            400 => BadRequest,
            401 => Unauthorized,
            404 => NotFound,
            405 => MethodNotAllowed,
            422 => UnprocessableEntity,
            500 => InternalServerError,
            code => Code(code),
        }
    }
}

/// HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    code: u16,
    headers: Headers,
    version: Version,
    body: Body,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty `200 OK` response.
    pub fn new() -> Self {
        let mut headers = Headers::new();
        headers.insert("server", "mutaties-websim");
        headers.insert("connection", "keep-alive");

        Self {
            code: 200,
            headers,
            version: Version::Http1,
            body: Body::Text(String::new()),
        }
        .text("")
    }

    /// Set the body. `Content-Length` and `Content-Type` follow the body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self.headers.insert("content-length", self.body.len());
        self.headers.insert("content-type", self.body.mime_type());
        self
    }

    pub fn status(&self) -> Status {
        self.code.into()
    }

    pub fn code(mut self, code: u16) -> Self {
        self.code = code;
        self
    }

    /// JSON body serialized from a Rust type.
    pub fn json(self, body: impl Serialize) -> Result<Self, super::Error> {
        let body = serde_json::to_vec(&body)?;
        Ok(self.body(Body::Json(body)))
    }

    pub fn text(self, body: impl ToString) -> Self {
        self.body(Body::Text(body.to_string()))
    }

    /// Add a header. The name is lowercased, the value is set as-is.
    pub fn header(mut self, name: impl ToString, value: impl ToString) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn get_body(&self) -> &Body {
        &self.body
    }

    /// Write the response to a stream. The stream is not flushed.
    pub async fn send(&self, mut stream: impl AsyncWrite + Unpin) -> Result<(), std::io::Error> {
        stream.write_all(&self.head_bytes()).await?;
        self.body.send(stream).await
    }

    fn head_bytes(&self) -> Vec<u8> {
        let status = self.status();
        let mut head = format!("{} {} {}\r\n", self.version, status.code(), status.reason())
            .as_bytes()
            .to_vec();

        head.extend_from_slice(&self.headers.to_bytes());
        head.extend_from_slice(b"\r\n");
        head
    }

    pub fn not_found() -> Self {
        Self::new().text("404 - Not Found").code(404)
    }

    pub fn method_not_allowed() -> Self {
        Self::new().text("405 - Method Not Allowed").code(405)
    }

    pub fn bad_request() -> Self {
        Self::new().text("400 - Bad Request").code(400)
    }

    pub fn unauthorized() -> Self {
        Self::new().text("401 - Unauthorized").code(401)
    }

    pub fn internal_error(err: impl std::error::Error) -> Self {
        Self::new()
            .text(format!("500 - Internal Server Error\n\n{}", err))
            .code(500)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_send() {
        let response = Response::new().text("hello").header("X-Test", "yes");
        let mut out = vec![];
        response.send(&mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("content-length: 5\r\n"));
        assert!(out.contains("content-type: text/plain; charset=utf-8\r\n"));
        assert!(out.contains("x-test: yes\r\n"));
        assert!(out.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_status() {
        assert_eq!(Response::not_found().status(), Status::NotFound);
        assert_eq!(Response::new().code(422).status().reason(), "Unprocessable Entity");
        assert_eq!(Status::from(418), Status::Code(418));
        assert!(!Status::Unauthorized.ok());
    }

    #[test]
    fn test_json() {
        let response = Response::new()
            .json(serde_json::json!({"message": "Queued. Thank you."}))
            .unwrap();

        assert_eq!(
            response.headers().get("content-type"),
            Some(&String::from("application/json"))
        );
        assert_eq!(
            response.get_body().as_bytes(),
            br#"{"message":"Queued. Thank you."}"#
        );
    }
}
