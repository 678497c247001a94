//! Conversion job request.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::rate::{RateTag, TransformResult};

/// One request to convert a beatmap set to a new rate.
///
/// Immutable once built; a job is owned by exactly one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Directory holding the set's charts and assets.
    pub source_dir: PathBuf,
    /// Playback speed multiplier.
    pub rate: f64,
    /// Directory the converted artifact is written into.
    pub output_dir: PathBuf,
    /// Compress the converted set into an archive.
    #[serde(default = "default_archive")]
    pub archive: bool,
    /// Change pitch along with speed.
    #[serde(default)]
    pub pitch_shift: bool,
}

fn default_archive() -> bool {
    true
}

impl ConversionJob {
    /// Create a job that archives its output and keeps pitch.
    pub fn new(source_dir: impl Into<PathBuf>, rate: f64, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            rate,
            output_dir: output_dir.into(),
            archive: default_archive(),
            pitch_shift: false,
        }
    }

    /// Set whether the output is archived.
    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    /// Set pitch-shift mode.
    pub fn with_pitch_shift(mut self, pitch_shift: bool) -> Self {
        self.pitch_shift = pitch_shift;
        self
    }

    /// Validated rate tag for this job.
    pub fn rate_tag(&self) -> TransformResult<RateTag> {
        RateTag::new(self.rate, self.pitch_shift)
    }

    /// Name of the source directory, for messages and output naming.
    pub fn source_name(&self) -> String {
        dir_name(&self.source_dir)
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "beatmapset".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_archive_without_pitch() {
        let job = ConversionJob::new("/sets/123 Song", 1.5, "/out");
        assert!(job.archive);
        assert!(!job.pitch_shift);
        assert_eq!(job.source_name(), "123 Song");
    }

    #[test]
    fn rate_tag_validates() {
        let job = ConversionJob::new("/sets/a", 1.0, "/out");
        assert!(job.rate_tag().is_err());

        let job = ConversionJob::new("/sets/a", 1.25, "/out").with_pitch_shift(true);
        assert_eq!(job.rate_tag().unwrap().suffix(), "1.25_P");
    }

    #[test]
    fn deserializes_with_defaults() {
        let job: ConversionJob =
            serde_json::from_str(r#"{"source_dir":"/s","rate":0.75,"output_dir":"/o"}"#).unwrap();
        assert!(job.archive);
        assert_eq!(job.rate, 0.75);
    }
}
