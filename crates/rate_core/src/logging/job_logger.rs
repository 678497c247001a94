//! Per-job logger with file and callback output.
//!
//! Each conversion job gets its own logger that:
//! - Optionally writes to a dedicated log file
//! - Sends messages to a callback (if provided)
//! - Mirrors every line to `tracing`
//! - Maintains a tail buffer of tool output for error diagnosis
//!
//! Workers share one logger through an `Arc`; all interior state sits
//! behind `parking_lot` mutexes.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineTag, LogCallback, LogConfig, LogLevel};

/// Per-job logger.
pub struct JobLogger {
    /// Job name for identification.
    job_name: String,
    /// Path to log file, if file output is enabled.
    log_path: Option<PathBuf>,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Callback for relaying messages.
    callback: Option<LogCallback>,
    /// Logging configuration.
    config: LogConfig,
    /// Tail buffer for recent tool output lines.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl JobLogger {
    /// Create a job logger that writes `<log_dir>/<job_name>.log`.
    ///
    /// # Arguments
    /// * `job_name` - Name of the job (used in log filename)
    /// * `log_dir` - Directory to write log file to
    /// * `config` - Logging configuration
    /// * `callback` - Optional callback for relayed output
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            job_name,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(100)),
        })
    }

    /// Create a logger without a log file.
    pub fn detached(
        job_name: impl Into<String>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            callback,
            config,
            tail_buffer: Mutex::new(VecDeque::with_capacity(100)),
        }
    }

    /// Get the job name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Get the log file path.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        match level {
            LogLevel::Trace => tracing::trace!(job = %self.job_name, "{}", message),
            LogLevel::Debug => tracing::debug!(job = %self.job_name, "{}", message),
            LogLevel::Info => tracing::info!(job = %self.job_name, "{}", message),
            LogLevel::Warn => tracing::warn!(job = %self.job_name, "{}", message),
            LogLevel::Error => tracing::error!(job = %self.job_name, "{}", message),
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        let msg = LineTag::Warning.apply(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        let msg = LineTag::Error.apply(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = LineTag::Command.apply(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        let msg = LineTag::Phase.apply(phase_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = LineTag::Success.apply(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Record a line of external tool output.
    ///
    /// In compact mode, these are only added to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            buffer.push_back(line.to_string());
        }

        if self.config.compact {
            return;
        }

        let tagged = LineTag::Tool { stderr: is_stderr }.apply(line);
        self.output(&self.format_message(&tagged));
    }

    /// Show the tail buffer (typically after a tool failure).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    /// Get the current tail buffer contents.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    /// Format a message with timestamp (if enabled).
    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    /// Output a formatted message to file and callback.
    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("set x1.5", dir.path(), LogConfig::default(), None).unwrap();

        let path = logger.log_path().unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().contains("set x1.5.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("test_job", dir.path(), LogConfig::default(), None).unwrap();

        logger.info("Test message");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("Test message"));
    }

    #[test]
    fn calls_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: LogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger = JobLogger::detached("test_job", LogConfig::default(), Some(callback));

        logger.info("Message 1");
        logger.warn("Message 2");
        logger.debug("filtered at info level");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn tail_buffer_maintains_limit() {
        let config = LogConfig {
            error_tail: 5,
            ..LogConfig::default()
        };
        let logger = JobLogger::detached("test_job", config, None);

        for i in 0..10 {
            logger.output_line(&format!("Line {}", i), false);
        }

        let tail = logger.get_tail();
        assert_eq!(tail.len(), 5);
        assert_eq!(tail[0], "Line 5");
        assert_eq!(tail[4], "Line 9");
    }

    #[test]
    fn verbose_mode_writes_tool_output() {
        let lines = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = lines.clone();
        let callback: LogCallback = Box::new(move |msg| sink.lock().push(msg.to_string()));
        let config = LogConfig {
            compact: false,
            show_timestamps: false,
            ..LogConfig::default()
        };
        let logger = JobLogger::detached("job", config, Some(callback));

        logger.output_line("Processing", false);
        logger.output_line("clipping", true);

        assert_eq!(*lines.lock(), vec!["  | Processing", "  ! clipping"]);
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("has:colon"), "has_colon");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
