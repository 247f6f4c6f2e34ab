//! Just enough HTTP/1.1 to run the test-double servers.
//!
//! Requests are read in full (head and `Content-Length` body) before they are handed
//! to a [`Controller`]. Routes match on path prefix.
pub mod body;
pub mod controller;
pub mod error;
pub mod head;
pub mod headers;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use body::Body;
pub use controller::Controller;
pub use error::Error;
pub use head::{Head, Method, Version};
pub use headers::Headers;
pub use request::Request;
pub use response::{Response, Status};
pub use router::{Handler, Router};
pub use server::{BoundServer, Server};
