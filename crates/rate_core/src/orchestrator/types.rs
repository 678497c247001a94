//! Core types for running a conversion job.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::logging::JobLogger;
use crate::rate::RateTag;

/// Progress callback type for reporting job progress.
///
/// Arguments: (phase_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Handle for cancelling a running job from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// The job stops at the next checkpoint and kills a running audio tool.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Read-only state of one job, shared by all of its workers.
///
/// Everything a worker needs is here; jobs share nothing with each other.
pub struct JobContext {
    /// Unique job identifier.
    pub job_id: String,
    /// Job name, also the artifact name (`<set> x1.5`).
    pub job_name: String,
    /// Canonical source directory.
    pub source_dir: PathBuf,
    /// Rate and naming mode.
    pub tag: RateTag,
    /// Per-job logger.
    pub logger: Arc<JobLogger>,
    /// Cancellation flag.
    pub cancel: CancelHandle,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl JobContext {
    pub fn new(
        job_id: impl Into<String>,
        job_name: impl Into<String>,
        source_dir: PathBuf,
        tag: RateTag,
        logger: Arc<JobLogger>,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            job_name: job_name.into(),
            source_dir,
            tag,
            logger,
            cancel,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, phase: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(phase, percent, message);
        }
    }

    /// Path of a file in the source directory.
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.source_dir.join(name)
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use parking_lot::Mutex;

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn progress_reaches_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let ctx = JobContext::new(
            "1",
            "set x1.5",
            PathBuf::from("/sets/set"),
            RateTag::new(1.5, false).unwrap(),
            Arc::new(JobLogger::detached("set x1.5", LogConfig::default(), None)),
            CancelHandle::new(),
        )
        .with_progress_callback(Some(Box::new(move |phase, pct, _msg| {
            sink.lock().push((phase.to_string(), pct));
        })));

        ctx.report_progress("Convert", 10, "starting");
        assert_eq!(*seen.lock(), vec![("Convert".to_string(), 10)]);
        assert_eq!(ctx.source_path("a.osu"), PathBuf::from("/sets/set/a.osu"));
    }
}
