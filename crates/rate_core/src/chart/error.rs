//! Chart error types.

use std::path::PathBuf;

/// Errors that can occur while reading or writing chart files.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    /// Failed to read chart file.
    #[error("Failed to read chart '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write chart file.
    #[error("Failed to write chart '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A `.osu` file without the `osu file format vN` header line.
    #[error("Missing 'osu file format' header")]
    MissingFormatHeader,

    /// A line that could not be decoded.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl ChartError {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for a 1-indexed line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;
