//! Local stand-ins for external services, for integration tests.
//!
//! * [`bondspas`]: the federation's pass download API.
//! * [`mail`]: the mail provider's send API.
pub mod bondspas;
pub mod mail;

pub use bondspas::BondspasController;
pub use mail::MailController;

use crate::config::Config;
use crate::http::{BoundServer, Controller, Error, Server};

/// Pass download server on `websim.bondspas_port`, or `port` if set.
pub async fn bondspas_server(config: &Config, port: Option<u16>) -> Result<BoundServer, Error> {
    Server::new(vec![BondspasController.route("/")])
        .name("bondspas websim")
        .bind(("127.0.0.1", port.unwrap_or(config.websim.bondspas_port)))
        .await
}

/// Mail provider on `websim.mail_port`, or `port` if set.
pub async fn mail_server(config: &Config, port: Option<u16>) -> Result<BoundServer, Error> {
    Server::new(vec![MailController::new(config.websim.mail_delay).route("/")])
        .name("mail websim")
        .bind(("127.0.0.1", port.unwrap_or(config.websim.mail_port)))
        .await
}
