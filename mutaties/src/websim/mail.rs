//! Mail provider simulator.
//!
//! Accepts anything that's POSTed and looks at the body to decide what to do:
//!
//! | body contains | response |
//! |---|---|
//! | `@bounce.now` | 422, undeliverable address |
//! | `faal` | 401, bad API key |
//! | `delay` | 200, after a delay |
//! | anything else | 200 |
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::sleep;
use tracing::info;
use uuid::Uuid;

use crate::http::{Controller, Error, Request, Response};

#[derive(Serialize, Debug)]
struct Queued {
    id: String,
    message: &'static str,
}

pub struct MailController {
    delay: Duration,
}

impl MailController {
    /// Simulator that waits `delay` before accepting mail marked `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Controller for MailController {
    async fn handle(&self, request: &Request) -> Result<Response, Error> {
        if !request.post() {
            return Ok(Response::method_not_allowed());
        }

        let body = request.string();

        if body.contains("@bounce.now") {
            return Ok(Response::new()
                .json(serde_json::json!({"message": "'to' parameter is not a valid address"}))?
                .code(422));
        }

        if body.contains("faal") {
            return Ok(Response::unauthorized());
        }

        if body.contains("delay") {
            info!("mail delayed by {:.1}s", self.delay.as_secs_f64());
            sleep(self.delay).await;
        }

        Response::new().json(Queued {
            id: format!("<{}@websim>", Uuid::new_v4()),
            message: "Queued. Thank you.",
        })
    }
}
