//! Pass download simulator.
//!
//! `GET /bondspas/<lid_nr>` returns a PDF for member numbers 100000 to 199999 and
//! 404 for anything else. Other paths are answered with a 500, which is what the
//! real service does too.
use std::ops::RangeInclusive;

use async_trait::async_trait;
use tracing::debug;

use crate::http::{Body, Controller, Error, Request, Response};

/// Member numbers that have a pass.
pub const KNOWN: RangeInclusive<u32> = 100_000..=199_999;

const PAYLOAD_SIZE: usize = 150_000;

pub struct BondspasController;

#[async_trait]
impl Controller for BondspasController {
    async fn handle(&self, request: &Request) -> Result<Response, Error> {
        let lid_nr = match request.path().strip_prefix("/bondspas/") {
            Some(lid_nr) => lid_nr,
            None => return Ok(Response::new().text("unsupported").code(500)),
        };

        match lid_nr.parse::<u32>() {
            Ok(lid_nr) if KNOWN.contains(&lid_nr) => {
                debug!("bondspas for {}", lid_nr);
                Ok(Response::new().body(Body::Pdf(pdf(lid_nr))).header(
                    "content-disposition",
                    format!("attachment; filename=\"bondspas_{}.pdf\"", lid_nr),
                ))
            }

            _ => Ok(Response::not_found()),
        }
    }
}

/// Something that looks like a PDF at first glance, about 150KB.
pub fn pdf(lid_nr: u32) -> Vec<u8> {
    let mut pdf = format!("%PDF-1.4\n% bondspas {}\n", lid_nr).into_bytes();
    let trailer = b"\n%%EOF\n";

    let line = format!("% lid {} {}\n", lid_nr, ".".repeat(48));
    while pdf.len() + line.len() + trailer.len() <= PAYLOAD_SIZE {
        pdf.extend_from_slice(line.as_bytes());
    }
    pdf.resize(PAYLOAD_SIZE - trailer.len(), b'.');
    pdf.extend_from_slice(trailer);

    pdf
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::http::request::test::request;
    use crate::http::Status;

    async fn get(path: &str) -> Response {
        let request = request(&format!("GET {} HTTP/1.1\r\n\r\n", path))
            .await
            .unwrap();
        BondspasController.handle(&request).await.unwrap()
    }

    #[tokio::test]
    async fn test_known_pass() {
        let response = get("/bondspas/100001").await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.headers().get("content-type"),
            Some(&String::from("application/pdf"))
        );
        assert!(response.get_body().as_bytes().starts_with(b"%PDF-1.4"));
        assert_eq!(response.get_body().len(), 150_000);
        assert_eq!(get("/bondspas/199999").await.status(), Status::Ok);
    }

    #[tokio::test]
    async fn test_unknown_pass() {
        assert_eq!(get("/bondspas/99999").await.status(), Status::NotFound);
        assert_eq!(get("/bondspas/200000").await.status(), Status::NotFound);
        assert_eq!(get("/bondspas/abc").await.status(), Status::NotFound);
    }

    #[tokio::test]
    async fn test_other_path() {
        assert_eq!(
            get("/pasfoto/100001").await.status(),
            Status::InternalServerError
        );
    }

    #[tokio::test]
    async fn test_server() {
        let config = crate::config::Config::default();
        let server = crate::websim::bondspas_server(&config, Some(0)).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let response = crate::http::server::test::roundtrip(
            addr,
            "GET /bondspas/150000 HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("content-length: 150000\r\n"));
        assert!(response.contains("content-type: application/pdf\r\n"));
        assert!(response.contains("filename=\"bondspas_150000.pdf\""));
        assert!(response.ends_with("%%EOF\n"));

        let response = crate::http::server::test::roundtrip(
            addr,
            "GET /bondspas/200000 HTTP/1.1\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn test_pdf() {
        let pdf = pdf(123456);
        assert_eq!(pdf.len(), 150_000);
        assert!(pdf.ends_with(b"%%EOF\n"));
    }
}
