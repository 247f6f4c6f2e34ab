//! Request handlers.
use async_trait::async_trait;

use super::{Error, Handler, Request, Response};

/// Answers requests for the routes it's mounted on.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Produce a response. Errors become a 400 or 500 response.
    async fn handle(&self, request: &Request) -> Result<Response, Error>;

    /// Mount this controller on every path starting with `prefix`.
    fn route(self, prefix: &str) -> Handler
    where
        Self: Sized + 'static,
    {
        Handler::new(prefix, self)
    }

    /// Name used in logs.
    fn controller_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
