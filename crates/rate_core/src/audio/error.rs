//! Audio tool error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Errors from one run of the external time-stretch tool.
#[derive(Debug, thiserror::Error)]
pub enum AudioToolError {
    /// The tool could not be started.
    #[error("Failed to start {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool exited with a non-zero status.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The tool exited successfully but wrote nothing.
    #[error("{tool} produced no output at {path}")]
    MissingOutput { tool: String, path: PathBuf },

    /// The tool ran past the configured limit and was killed.
    #[error("{tool} timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    /// The job was cancelled while the tool was running.
    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    /// Refusing to overwrite an existing file.
    #[error("Output already exists: {0}")]
    OutputExists(PathBuf),

    /// Waiting on or killing the process failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl AudioToolError {
    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Whether the run stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for audio tool operations.
pub type AudioResult<T> = Result<T, AudioToolError>;
