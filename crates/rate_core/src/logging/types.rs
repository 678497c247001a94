//! Log levels, per-job logger configuration and line tags.

use serde::{Deserialize, Serialize};

/// Severity of a job log line, also used as the `[logging] level` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a [`JobLogger`](super::JobLogger) filters and formats its lines.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Lines below this level are dropped.
    pub level: LogLevel,
    /// Audio tool output goes to the tail buffer only.
    pub compact: bool,
    /// Tool output lines kept for a failure dump.
    pub error_tail: usize,
    /// Prefix each line with `[HH:MM:SS]`.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

/// Receives every formatted line, e.g. to relay progress to a chat channel.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Marker put in front of a job log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    /// `$ soundstretch ...`
    Command,
    /// `=== Convert ===`
    Phase,
    Success,
    Warning,
    Error,
    /// A line printed by the audio tool.
    Tool { stderr: bool },
}

impl LineTag {
    pub fn apply(self, message: &str) -> String {
        match self {
            LineTag::Command => format!("$ {}", message),
            LineTag::Phase => format!("=== {} ===", message),
            LineTag::Success => format!("[OK] {}", message),
            LineTag::Warning => format!("[WARN] {}", message),
            LineTag::Error => format!("[ERROR] {}", message),
            LineTag::Tool { stderr: false } => format!("  | {}", message),
            LineTag::Tool { stderr: true } => format!("  ! {}", message),
        }
    }
}
