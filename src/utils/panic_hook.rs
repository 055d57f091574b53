//! Panic reporting for contained plugin failures.
//!
//! Plugin panics are caught and turned into one diagnostic line. The default
//! hook would print its own multi-line report to stderr first, so the console
//! installs a hook that sends the report to the debug log instead.

use std::panic::{self, Location};

use tracing::debug;

use crate::plugins::panic_message;

/// Replace the process panic hook with one that logs at debug level.
pub fn install_quiet_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let message = panic_message(info.payload());
        debug!(panic = %describe_panic(&message, info.location()), "Panic caught");
    }));
}

/// `message at file:line`, or just the message when the location is unknown.
pub fn describe_panic(message: &str, location: Option<&Location<'_>>) -> String {
    match location {
        Some(location) => format!("{} at {}:{}", message, location.file(), location.line()),
        None => message.to_string(),
    }
}
