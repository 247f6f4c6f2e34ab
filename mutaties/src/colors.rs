//! Colored log output, only when stderr is a terminal.
use crate::config::get_config;
use colored::{Color, Colorize};

pub trait MaybeColorize: AsRef<str> {
    /// Paint the text if we're writing to a terminal, otherwise leave it alone.
    fn colorize(&self, color: Color) -> String {
        if get_config().general.tty {
            Colorize::color(self.as_ref(), color).to_string()
        } else {
            self.as_ref().to_string()
        }
    }

    fn green(&self) -> String {
        self.colorize(Color::Green)
    }

    fn red(&self) -> String {
        self.colorize(Color::Red)
    }

    fn purple(&self) -> String {
        self.colorize(Color::Magenta)
    }

    fn yellow(&self) -> String {
        self.colorize(Color::Yellow)
    }
}

impl<T: AsRef<str> + ?Sized> MaybeColorize for T {}
