//! Prefix routing.
use std::ops::Deref;

use tracing::info;

use super::Controller;
use crate::colors::MaybeColorize;

/// A controller mounted on a path prefix.
pub struct Handler {
    prefix: String,
    controller: Box<dyn Controller>,
}

impl Handler {
    pub fn new(prefix: &str, controller: impl Controller + 'static) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            controller: Box::new(controller),
        }
    }

    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Does the path fall under this handler? Only whole segments match:
    /// `/bondspas` matches `/bondspas/1` but not `/bondspassen`.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

impl Deref for Handler {
    type Target = Box<dyn Controller>;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

/// Picks the handler with the longest matching prefix.
#[derive(Default)]
pub struct Router {
    handlers: Vec<Handler>,
}

impl Router {
    pub fn new(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }

    pub fn find(&self, path: &str) -> Option<&Handler> {
        self.handlers
            .iter()
            .filter(|handler| handler.matches(path))
            .max_by_key(|handler| handler.prefix.len())
    }

    pub fn log_routes(&self) {
        let mut handlers = self.handlers.iter().collect::<Vec<_>>();
        handlers.sort_by(|a, b| a.prefix().cmp(b.prefix()));

        for handler in handlers {
            info!(
                ">> {} => {}",
                handler.prefix().purple(),
                handler.controller_name().green()
            );
        }
    }
}
