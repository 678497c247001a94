//! Error types for conversion jobs.
//!
//! Only fatal conditions become a [`JobError`]. Per-chart failures are
//! recorded as exclusions on an otherwise successful result.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ExcludedChart;
use crate::packaging::PackagingError;

/// Top-level job error with job context.
#[derive(Error, Debug)]
pub enum JobError {
    /// Input validation failed before any work started.
    #[error("Job '{job_name}' failed validation: {message}")]
    Validation { job_name: String, message: String },

    /// Another job is running against the same source directory.
    #[error("Job '{job_name}' refused: {path} is already being converted")]
    SourceBusy { job_name: String, path: PathBuf },

    /// No chart survived parsing and conversion.
    #[error("Job '{job_name}' has nothing to convert ({} charts excluded)", excluded.len())]
    NothingToConvert {
        job_name: String,
        excluded: Vec<ExcludedChart>,
    },

    /// A shared asset (audio track or storyboard) failed to convert.
    #[error("Job '{job_name}' failed converting shared assets: {reason}")]
    AudioFailed { job_name: String, reason: String },

    /// Assembling the output failed; nothing was produced.
    #[error("Job '{job_name}' packaging failed: {source}")]
    PackagingFailed {
        job_name: String,
        #[source]
        source: PackagingError,
    },

    /// The job was cancelled.
    #[error("Job '{job_name}' was cancelled")]
    Cancelled { job_name: String },
}

impl JobError {
    pub fn validation(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(job_name: impl Into<String>) -> Self {
        Self::Cancelled {
            job_name: job_name.into(),
        }
    }

    /// Message safe to show an end user: no paths, no tool output.
    pub fn user_message(&self) -> String {
        match self {
            JobError::Validation { message, .. } => format!("Invalid request: {}.", message),
            JobError::SourceBusy { .. } => {
                "This beatmap set is already being converted. Try again when it finishes."
                    .to_string()
            }
            JobError::NothingToConvert { .. } => {
                "None of the difficulties in this beatmap set could be converted.".to_string()
            }
            JobError::AudioFailed { .. } => {
                "The audio could not be converted, so nothing was produced.".to_string()
            }
            JobError::PackagingFailed { .. } => {
                "The converted beatmap set could not be packaged.".to_string()
            }
            JobError::Cancelled { .. } => "The conversion was cancelled.".to_string(),
        }
    }
}

/// Result type for conversion jobs.
pub type ConvertResult<T> = Result<T, JobError>;
