//! Application-wide logging through `tracing`.
//!
//! Workers and the websim servers log to stderr, `INFO` and up unless `RUST_LOG`
//! says otherwise (e.g. `RUST_LOG=mutaties=debug` to see every ping). Libraries
//! embedding the queues can skip this and install their own subscriber.
//!
//! ```rust
//! use mutaties::logging::Logger;
//!
//! Logger::init();
//! ```
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::filter::LevelFilter;

use crate::config::get_config;

static LEVEL: OnceCell<LevelFilter> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Log at `INFO` unless `RUST_LOG` is set. Only the first call does anything.
    pub fn init() {
        Self::init_level(LevelFilter::INFO);
    }

    /// Like [`Logger::init`], with a different default level.
    pub fn init_level(level: LevelFilter) {
        LEVEL.get_or_init(|| {
            let filter = EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy();

            // A test harness may have installed one already.
            let _ = fmt()
                .with_env_filter(filter)
                .with_ansi(get_config().general.tty)
                .with_target(false)
                .finish()
                .try_init();

            get_config().log_info();
            level
        });
    }
}
