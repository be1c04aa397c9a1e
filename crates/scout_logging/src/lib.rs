#![deny(missing_docs)]
//! Shared logging utilities for the scout workspace.
//!
//! This crate provides the `scout_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Messages go through
//! the `log` facade; the binary decides where they end up.
//!
//! Every macro accepts an optional `session = <id>;` prefix that tags the line
//! with the session it belongs to:
//!
//! ```
//! let id = "scrape-1700000000000";
//! scout_logging::scout_info!(session = id; "pull returned {} companies", 12);
//! scout_logging::scout_info!("no session context here");
//! ```

/// Log target used by every `scout_*` macro, so the whole workspace can be
/// filtered with a single directive.
pub const TARGET: &str = "scout";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! scout_trace {
    (session = $id:expr; $($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET, "[{}] {}", $id, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! scout_debug {
    (session = $id:expr; $($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET, "[{}] {}", $id, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! scout_info {
    (session = $id:expr; $($arg:tt)*) => {{
        log::info!(target: $crate::TARGET, "[{}] {}", $id, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::info!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! scout_warn {
    (session = $id:expr; $($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET, "[{}] {}", $id, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! scout_error {
    (session = $id:expr; $($arg:tt)*) => {{
        log::error!(target: $crate::TARGET, "[{}] {}", $id, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::error!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
