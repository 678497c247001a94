//! Logging infrastructure.
//!
//! This module provides:
//! - Per-job loggers with optional log file + callback output
//! - Tail buffer of external tool output for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use rate_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("my_set x1.5", "/path/to/logs", LogConfig::default(), None)
//!     .unwrap();
//!
//! logger.phase("Convert");
//! logger.command("soundstretch in.mp3 out.mp3 -tempo=50");
//! logger.success("Job completed");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LineTag, LogCallback, LogConfig, LogLevel};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr with timestamps
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.filter_directive()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_deserializes_lowercase() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let parsed: Wrapper = toml::from_str("level = \"warn\"").unwrap();
        assert_eq!(parsed.level, LogLevel::Warn);
    }
}
