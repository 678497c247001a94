//! External time-stretch tool wrapper.
//!
//! The tool is invoked as `tool <input> <output> -tempo=N` (or `-rate=N`
//! when pitch changes with speed), where `N` is the percent change
//! `round(rate * 100 - 100)`. Success means exit code 0 and an output file
//! present at `<output>`.

use std::io::{BufRead, BufReader, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::AudioSettings;
use crate::logging::JobLogger;
use crate::orchestrator::CancelHandle;
use crate::rate::RateTag;

use super::error::{AudioResult, AudioToolError};

/// Number of stderr lines kept for a failure message.
const STDERR_MESSAGE_LINES: usize = 5;

/// Runs the external time-stretch tool.
#[derive(Debug, Clone)]
pub struct AudioStretcher {
    program: PathBuf,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl AudioStretcher {
    /// Create a stretcher for the given program with no timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
            timeout: None,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Create a stretcher from the `[audio]` settings.
    pub fn from_settings(settings: &AudioSettings) -> Self {
        let working_dir = (!settings.working_dir.is_empty())
            .then(|| PathBuf::from(&settings.working_dir));

        Self {
            program: PathBuf::from(&settings.tool),
            working_dir,
            timeout: settings.timeout(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Short tool name used in messages.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Tool argument for a rate: `-tempo=50` for 1.5x, `-rate=-25` for 0.75x
    /// in pitch-shift mode.
    pub fn rate_argument(tag: &RateTag) -> String {
        let percent = (tag.rate() * 100.0 - 100.0).round() as i64;
        let flag = if tag.pitch_shift() { "rate" } else { "tempo" };
        format!("-{}={}", flag, percent)
    }

    /// Produce a rate-adjusted copy of `input` at `output`.
    ///
    /// Blocks until the tool exits. The process is killed when `cancel`
    /// fires or the timeout elapses. Output lines go to the logger's tail
    /// buffer. Never overwrites an existing `output`; a partial output left
    /// by a failed run is the caller's to remove.
    pub fn stretch(
        &self,
        input: &Path,
        output: &Path,
        tag: &RateTag,
        cancel: &CancelHandle,
        logger: &JobLogger,
    ) -> AudioResult<()> {
        if output.exists() {
            return Err(AudioToolError::OutputExists(output.to_path_buf()));
        }

        let tool = self.tool_name();
        let rate_arg = Self::rate_argument(tag);

        let mut cmd = Command::new(&self.program);
        cmd.arg(input)
            .arg(output)
            .arg(&rate_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        // Wrapper scripts start the real tool as a child; a group kill
        // reaches both and closes the output pipes.
        #[cfg(unix)]
        cmd.process_group(0);

        logger.command(&format!(
            "{} \"{}\" \"{}\" {}",
            self.program.display(),
            input.display(),
            output.display(),
            rate_arg
        ));

        let mut child = cmd.spawn().map_err(|source| AudioToolError::SpawnFailed {
            tool: tool.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (status, stderr_lines) = thread::scope(|s| {
            let stdout_reader = s.spawn(move || drain(stdout, false, logger));
            let stderr_reader = s.spawn(move || drain(stderr, true, logger));

            let status = self.wait(&mut child, &tool, cancel);

            let _ = stdout_reader.join();
            let stderr_lines = stderr_reader.join().unwrap_or_default();
            (status, stderr_lines)
        });

        let status = status?;
        if !status.success() {
            logger.show_tail(&tool);
            let start = stderr_lines.len().saturating_sub(STDERR_MESSAGE_LINES);
            return Err(AudioToolError::command_failed(
                tool,
                status.code().unwrap_or(-1),
                stderr_lines[start..].join("\n"),
            ));
        }

        if !output.is_file() {
            logger.show_tail(&tool);
            return Err(AudioToolError::MissingOutput {
                tool,
                path: output.to_path_buf(),
            });
        }

        Ok(())
    }

    /// Poll the child until it exits, is cancelled or times out.
    fn wait(&self, child: &mut Child, tool: &str, cancel: &CancelHandle) -> AudioResult<ExitStatus> {
        let started = Instant::now();

        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    kill(child);
                    return Err(AudioToolError::io_error("waiting for audio tool", e));
                }
            }

            if cancel.is_cancelled() {
                kill(child);
                return Err(AudioToolError::Cancelled {
                    tool: tool.to_string(),
                });
            }

            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    kill(child);
                    return Err(AudioToolError::TimedOut {
                        tool: tool.to_string(),
                        timeout: limit,
                    });
                }
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Kill the tool and everything in its process group, then reap it.
fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = child.id() as libc::pid_t;
        // SAFETY: plain syscall; `group` is our unreaped child's pid, which
        // leads its own group, so the id cannot have been recycled.
        if unsafe { libc::killpg(group, libc::SIGKILL) } != 0 {
            tracing::warn!(
                "Failed to kill audio tool process group: {}",
                std::io::Error::last_os_error()
            );
        }
    }
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to kill audio tool: {}", e);
    }
    let _ = child.wait();
}

/// Forward every line of a pipe to the logger, returning stderr lines.
fn drain<R: Read>(pipe: Option<R>, is_stderr: bool, logger: &JobLogger) -> Vec<String> {
    let mut kept = Vec::new();
    let Some(pipe) = pipe else {
        return kept;
    };

    for line in BufReader::new(pipe).lines().map_while(Result::ok) {
        logger.output_line(&line, is_stderr);
        if is_stderr {
            kept.push(line);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;

    fn tag(rate: f64, pitch: bool) -> RateTag {
        RateTag::new(rate, pitch).unwrap()
    }

    #[test]
    fn rate_argument_is_percent_change() {
        assert_eq!(AudioStretcher::rate_argument(&tag(1.5, false)), "-tempo=50");
        assert_eq!(AudioStretcher::rate_argument(&tag(0.75, false)), "-tempo=-25");
        assert_eq!(AudioStretcher::rate_argument(&tag(1.33, true)), "-rate=33");
        assert_eq!(AudioStretcher::rate_argument(&tag(2.0, false)), "-tempo=100");
    }

    #[test]
    fn from_settings_reads_audio_section() {
        let settings = AudioSettings {
            tool: "/opt/bin/soundstretch".to_string(),
            timeout_secs: 0,
            ..AudioSettings::default()
        };
        let stretcher = AudioStretcher::from_settings(&settings);
        assert_eq!(stretcher.tool_name(), "soundstretch");
        assert_eq!(stretcher.timeout, None);
        assert_eq!(stretcher.working_dir, None);
    }

    #[test]
    fn refuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp3");
        std::fs::write(&output, b"x").unwrap();

        let logger = JobLogger::detached("t", LogConfig::default(), None);
        let result = AudioStretcher::new("true").stretch(
            &dir.path().join("in.mp3"),
            &output,
            &tag(1.5, false),
            &CancelHandle::new(),
            &logger,
        );
        assert!(matches!(result, Err(AudioToolError::OutputExists(_))));
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let logger = JobLogger::detached("t", LogConfig::default(), None);
        let result = AudioStretcher::new(dir.path().join("no-such-tool")).stretch(
            &dir.path().join("in.mp3"),
            &dir.path().join("out.mp3"),
            &tag(1.5, false),
            &CancelHandle::new(),
            &logger,
        );
        assert!(matches!(result, Err(AudioToolError::SpawnFailed { .. })));
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn run(stretcher: &AudioStretcher, dir: &TempDir, cancel: &CancelHandle) -> AudioResult<()> {
            let input = dir.path().join("in.mp3");
            fs::write(&input, b"audio").unwrap();
            let logger = JobLogger::detached("t", LogConfig::default(), None);
            stretcher.stretch(
                &input,
                &dir.path().join("out.mp3"),
                &tag(1.5, false),
                cancel,
                &logger,
            )
        }

        #[test]
        fn copies_output_and_passes_rate_argument() {
            let dir = tempfile::tempdir().unwrap();
            let args = dir.path().join("args.txt");
            let tool = script(
                &dir,
                "stretch.sh",
                &format!("printf '%s\\n' \"$3\" > \"{}\"\ncp \"$1\" \"$2\"", args.display()),
            );

            run(&AudioStretcher::new(tool), &dir, &CancelHandle::new()).unwrap();

            assert_eq!(fs::read(dir.path().join("out.mp3")).unwrap(), b"audio");
            assert_eq!(fs::read_to_string(args).unwrap().trim(), "-tempo=50");
        }

        #[test]
        fn nonzero_exit_is_command_failure() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "fail.sh", "echo 'bad header' >&2\nexit 3");

            let err = run(&AudioStretcher::new(tool), &dir, &CancelHandle::new()).unwrap_err();
            match err {
                AudioToolError::CommandFailed {
                    exit_code, message, ..
                } => {
                    assert_eq!(exit_code, 3);
                    assert_eq!(message, "bad header");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn success_without_file_is_missing_output() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "noop.sh", "exit 0");

            let err = run(&AudioStretcher::new(tool), &dir, &CancelHandle::new()).unwrap_err();
            assert!(matches!(err, AudioToolError::MissingOutput { .. }));
        }

        #[test]
        fn slow_tool_is_killed_on_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "slow.sh", "exec sleep 30");
            let stretcher =
                AudioStretcher::new(tool).with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let err = run(&stretcher, &dir, &CancelHandle::new()).unwrap_err();
            assert!(matches!(err, AudioToolError::TimedOut { .. }));
            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(err.to_string().ends_with("timed out after 200ms"), "{err}");
        }

        #[test]
        fn timeout_kills_children_of_wrapper_script() {
            let dir = tempfile::tempdir().unwrap();
            // No exec: the shell stays alive and `sleep` inherits the pipes.
            let tool = script(&dir, "wrapper.sh", "sleep 30
echo done");
            let stretcher =
                AudioStretcher::new(tool).with_timeout(Some(Duration::from_millis(200)));

            let started = Instant::now();
            let err = run(&stretcher, &dir, &CancelHandle::new()).unwrap_err();
            assert!(matches!(err, AudioToolError::TimedOut { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
        }

        #[test]
        fn killed_wrapper_stops_writing_output() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(
                &dir,
                "writer.sh",
                "(while true; do echo chunk >> \"$2\"; sleep 0.05; done)",
            );
            let stretcher =
                AudioStretcher::new(tool).with_timeout(Some(Duration::from_millis(300)));

            let err = run(&stretcher, &dir, &CancelHandle::new()).unwrap_err();
            assert!(matches!(err, AudioToolError::TimedOut { .. }));

            let output = dir.path().join("out.mp3");
            let _ = fs::remove_file(&output);
            thread::sleep(Duration::from_millis(400));
            assert!(!output.exists());
        }

        #[test]
        fn cancel_kills_running_tool() {
            let dir = tempfile::tempdir().unwrap();
            let tool = script(&dir, "slow.sh", "sleep 30");
            let cancel = CancelHandle::new();

            let trigger = cancel.clone();
            let canceller = thread::spawn(move || {
                thread::sleep(Duration::from_millis(150));
                trigger.cancel();
            });

            let started = Instant::now();
            let err = run(&AudioStretcher::new(tool), &dir, &cancel).unwrap_err();
            canceller.join().unwrap();
            assert!(err.is_cancelled());
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
