//! Packaging error types.

use std::io;
use std::path::PathBuf;

/// Errors raised while assembling, archiving or unpacking a set.
#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The archive could not be written or read.
    #[error("Archive error in {operation}: {source}")]
    Archive {
        operation: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// Directory traversal failed.
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// An archive entry would land outside the destination.
    #[error("Archive entry escapes destination: {0}")]
    UnsafeEntry(String),

    /// Refusing to replace an existing file.
    #[error("Target already exists: {0}")]
    TargetExists(PathBuf),
}

impl PackagingError {
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn archive_error(operation: impl Into<String>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for packaging operations.
pub type PackagingResult<T> = Result<T, PackagingError>;
