//! Rate Core - backend logic for osu! rate changing.
//!
//! This crate contains all business logic with zero UI dependencies.
//! It converts a beatmap set to a different playback rate: charts are
//! rescaled in-process, audio is stretched by an external tool, and the
//! result is packaged as a directory or `.osz` archive.

pub mod audio;
pub mod chart;
pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod packaging;
pub mod rate;

pub use models::{ConversionJob, JobResult};
pub use orchestrator::{CancelHandle, JobError, RateChanger};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
