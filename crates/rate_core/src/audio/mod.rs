//! Audio time-stretching through an external command-line tool.
//!
//! No DSP happens in this crate; [`AudioStretcher`] spawns the configured
//! tool, watches it for cancellation and timeouts, and checks that it
//! produced an output file.

mod error;
mod stretcher;

pub use error::{AudioResult, AudioToolError};
pub use stretcher::AudioStretcher;
