//! Per-file outcomes and job results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A converted file waiting in the source directory to be packaged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Where the worker left the file.
    pub path: PathBuf,
    /// Name the file gets inside the output.
    pub final_name: String,
}

impl StagedFile {
    pub fn new(path: impl Into<PathBuf>, final_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            final_name: final_name.into(),
        }
    }
}

/// Result of converting one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Converted {
        /// Source file name.
        source_name: String,
        file: StagedFile,
    },
    /// The chart was left out of the output; the job continues.
    Excluded { chart_name: String, reason: String },
}

impl ChartOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ChartOutcome::Converted { .. })
    }
}

/// Kind of shared asset converted next to the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Audio,
    Storyboard,
}

impl AssetKind {
    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Audio => "audio",
            AssetKind::Storyboard => "storyboard",
        }
    }
}

/// Result of converting one shared asset.
///
/// Every chart depends on the shared assets, so any failure here is fatal
/// to the job.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetOutcome {
    Converted {
        kind: AssetKind,
        source_name: String,
        file: StagedFile,
    },
    Failed {
        kind: AssetKind,
        source_name: String,
        reason: String,
    },
}

impl AssetOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AssetOutcome::Failed { .. })
    }

    pub fn staged(&self) -> Option<&StagedFile> {
        match self {
            AssetOutcome::Converted { file, .. } => Some(file),
            AssetOutcome::Failed { .. } => None,
        }
    }
}

/// A chart left out of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedChart {
    pub name: String,
    pub reason: String,
}

/// Successful job result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Archive file or loose output directory.
    pub artifact_path: PathBuf,
    /// File names of the converted charts, sorted.
    pub converted: Vec<String>,
    /// Charts that were excluded, in source order.
    pub excluded: Vec<ExcludedChart>,
}

impl JobResult {
    /// Names of the excluded charts.
    pub fn excluded_names(&self) -> Vec<&str> {
        self.excluded.iter().map(|e| e.name.as_str()).collect()
    }

    /// Informational note about excluded charts, if any.
    pub fn excluded_note(&self) -> Option<String> {
        if self.excluded.is_empty() {
            return None;
        }
        Some(format!(
            "Some difficulties could not be converted: {}",
            self.excluded_names().join(", ")
        ))
    }
}
