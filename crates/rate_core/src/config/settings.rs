//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// External audio tool settings.
    #[serde(default)]
    pub audio: AudioSettings,

    /// Output packaging settings.
    #[serde(default)]
    pub packaging: PackagingSettings,
}

/// Path configuration for output, work and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default output folder when a job names none.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder where uploaded archives are unpacked.
    #[serde(default = "default_work_folder")]
    pub work_folder: String,

    /// Folder for job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "rate_output".to_string()
}

fn default_work_folder() -> String {
    ".work".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            work_folder: default_work_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level for job logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep audio tool output out of the log unless it fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Write one log file per job into `paths.logs_folder`.
    #[serde(default)]
    pub job_log_files: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            job_log_files: false,
        }
    }
}

impl LoggingSettings {
    /// Job logger configuration for these settings.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            error_tail: self.error_tail as usize,
            show_timestamps: true,
        }
    }
}

/// External time-stretch tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Program invoked as `tool <input> <output> -tempo=N`.
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Working directory for the tool (empty = inherit).
    #[serde(default)]
    pub working_dir: String,

    /// Extensions treated as audio tracks of a set.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Seconds before a tool run is killed (0 disables the limit).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How often a running tool is checked for exit or cancellation.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_tool() -> String {
    "soundstretch".to_string()
}

fn default_extensions() -> Vec<String> {
    ["mp3", "ogg", "wav"].iter().map(|e| e.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            working_dir: String::new(),
            extensions: default_extensions(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl AudioSettings {
    /// Timeout as a duration, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Whether a file extension names an audio track (case-insensitive).
    pub fn is_audio_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Output packaging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingSettings {
    /// Compress output into an archive unless the job says otherwise.
    #[serde(default = "default_true")]
    pub archive: bool,

    /// Extension of produced archives.
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
}

fn default_archive_extension() -> String {
    "osz".to_string()
}

impl Default for PackagingSettings {
    fn default() -> Self {
        Self {
            archive: true,
            archive_extension: default_archive_extension(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Audio,
    Packaging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Audio,
        ConfigSection::Packaging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Audio => "audio",
            ConfigSection::Packaging => "packaging",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output, work and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Audio => "External time-stretch tool",
            ConfigSection::Packaging => "Output packaging",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[audio]"));
        assert!(toml.contains("tool = \"soundstretch\""));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.output_folder, settings.paths.output_folder);
        assert_eq!(parsed.audio.extensions, vec!["mp3", "ogg", "wav"]);
        assert!(parsed.audio.is_audio_extension("OGG"));
        assert_eq!(parsed.packaging.archive_extension, "osz");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[audio]\ntool = \"/opt/stretch\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.audio.tool, "/opt/stretch");
        assert_eq!(parsed.audio.timeout_secs, 600);
        assert!(parsed.packaging.archive);
        assert!(parsed.logging.compact);
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let audio = AudioSettings {
            timeout_secs: 0,
            ..AudioSettings::default()
        };
        assert_eq!(audio.timeout(), None);
        assert_eq!(
            AudioSettings::default().timeout(),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn audio_extension_match_ignores_case() {
        let audio = AudioSettings::default();
        assert!(audio.is_audio_extension("MP3"));
        assert!(!audio.is_audio_extension("ogg"));
    }
}
