//! Job coordinator: one conversion end to end.
//!
//! ```text
//! validate -> claim source dir -> scan -> parse charts -> plan names
//!     -> fan out workers (charts, audio, storyboards) -> join
//!     -> package or roll back -> remove staged files from source
//! ```
//!
//! Workers run on scoped threads, one per file. The coordinator blocks
//! until all of them have reported; only then does it look at the fatal
//! flag and decide between packaging and rollback.

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::audio::AudioStretcher;
use crate::chart::{ChartCodec, OsuCodec, CHART_EXTENSION, STORYBOARD_EXTENSION};
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::models::{
    AssetKind, AssetOutcome, ChartOutcome, ConversionJob, ExcludedChart, JobResult, StagedFile,
};
use crate::packaging::{remove_file_quietly, PackageRequest, Packager};
use crate::rate::{converted_chart_name, output_dir_name};

use super::errors::{ConvertResult, JobError};
use super::inventory::{file_name, file_stem, SetInventory};
use super::types::{CancelHandle, JobContext, ProgressCallback};
use super::workers::{self, display_name, ChartTask};

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_job_id() -> String {
    format!("{}-{}", process::id(), JOB_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Rate-change service.
///
/// Construct once and share (it is `Sync`); every call to
/// [`convert`](Self::convert) runs an independent job. Jobs against
/// different source directories may run concurrently; a second job against
/// a directory that already has one in flight is refused.
pub struct RateChanger {
    settings: Settings,
    codec: Arc<dyn ChartCodec>,
    stretcher: AudioStretcher,
    packager: Packager,
    active: Mutex<HashSet<PathBuf>>,
}

impl RateChanger {
    pub fn new(settings: Settings) -> Self {
        let stretcher = AudioStretcher::from_settings(&settings.audio);

        let mut skip_extensions = vec![CHART_EXTENSION.to_string(), STORYBOARD_EXTENSION.to_string()];
        skip_extensions.extend(settings.audio.extensions.iter().cloned());
        let packager = Packager::new(skip_extensions, settings.packaging.archive_extension.clone());

        Self {
            settings,
            codec: Arc::new(OsuCodec),
            stretcher,
            packager,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run a job to completion.
    pub fn convert(&self, job: &ConversionJob) -> ConvertResult<JobResult> {
        self.convert_with(job, CancelHandle::new(), None)
    }

    /// Run a job with a cancellation handle and an optional progress callback.
    pub fn convert_with(
        &self,
        job: &ConversionJob,
        cancel: CancelHandle,
        progress: Option<ProgressCallback>,
    ) -> ConvertResult<JobResult> {
        let fallback_name = job.source_name();

        let tag = job
            .rate_tag()
            .map_err(|_| JobError::validation(&fallback_name, "rate must be positive, finite and not 1"))?;
        let job_name = output_dir_name(&job.source_name(), &tag);

        if !job.source_dir.is_dir() {
            tracing::warn!("Source is not a directory: {}", job.source_dir.display());
            return Err(JobError::validation(&job_name, "source is not a directory"));
        }
        let source_dir = job.source_dir.canonicalize().map_err(|e| {
            tracing::warn!("Cannot resolve {}: {}", job.source_dir.display(), e);
            JobError::validation(&job_name, "source directory is not accessible")
        })?;
        let output_root = resolve_output_root(&source_dir, &job.output_dir)
            .map_err(|message| JobError::validation(&job_name, message))?;

        let _claim = ActiveJob::claim(&self.active, &source_dir).ok_or_else(|| {
            JobError::SourceBusy {
                job_name: job_name.clone(),
                path: source_dir.clone(),
            }
        })?;

        let inventory = SetInventory::scan(&source_dir, &self.settings.audio.extensions).map_err(|e| {
            tracing::warn!("Failed to scan {}: {}", source_dir.display(), e);
            JobError::validation(&job_name, "source directory could not be read")
        })?;
        if inventory.charts.is_empty() {
            return Err(JobError::validation(&job_name, "source contains no chart files"));
        }

        let ctx = JobContext::new(
            next_job_id(),
            job_name.clone(),
            source_dir,
            tag,
            Arc::new(self.create_logger(&job_name)),
            cancel,
        )
        .with_progress_callback(progress);

        ctx.logger.phase(&format!("Converting {} at {}x", job.source_name(), tag.rate()));
        tracing::info!(job = %job_name, id = %ctx.job_id, "Starting conversion");

        let result = self.run(&ctx, job, &output_root, &inventory);
        match &result {
            Ok(done) => {
                ctx.logger.success(&format!("Wrote {}", done.artifact_path.display()));
                ctx.report_progress("Done", 100, "Conversion complete");
            }
            Err(e) => ctx.logger.error(&e.to_string()),
        }
        ctx.logger.close();
        result
    }

    fn create_logger(&self, job_name: &str) -> JobLogger {
        let config = self.settings.logging.log_config();
        if self.settings.logging.job_log_files {
            match JobLogger::new(job_name, &self.settings.paths.logs_folder, config.clone(), None) {
                Ok(logger) => return logger,
                Err(e) => tracing::warn!("Job log file unavailable, logging to tracing only: {}", e),
            }
        }
        JobLogger::detached(job_name, config, None)
    }

    fn run(
        &self,
        ctx: &JobContext,
        job: &ConversionJob,
        output_root: &Path,
        inventory: &SetInventory,
    ) -> ConvertResult<JobResult> {
        ctx.report_progress("Scan", 5, "Reading charts");
        let (mut slots, tasks) = self.plan_charts(ctx, inventory);
        if tasks.is_empty() {
            return Err(JobError::NothingToConvert {
                job_name: ctx.job_name.clone(),
                excluded: excluded_charts(slots.into_iter().flatten()),
            });
        }

        if ctx.cancel.is_cancelled() {
            return Err(JobError::cancelled(&ctx.job_name));
        }

        ctx.logger.phase("Convert");
        ctx.report_progress(
            "Convert",
            10,
            &format!(
                "{} charts, {} audio, {} storyboards",
                tasks.len(),
                inventory.audio.len(),
                inventory.storyboards.len()
            ),
        );

        let fatal = AtomicBool::new(false);
        let assets = self.run_workers(ctx, &tasks, inventory, &fatal, &mut slots);
        let charts: Vec<ChartOutcome> = slots.into_iter().flatten().collect();

        let staged: Vec<StagedFile> = charts
            .iter()
            .filter_map(|outcome| match outcome {
                ChartOutcome::Converted { file, .. } => Some(file.clone()),
                ChartOutcome::Excluded { .. } => None,
            })
            .chain(assets.iter().filter_map(|a| a.staged().cloned()))
            .collect();

        let result = self.finish(ctx, job, output_root, &charts, &assets, &staged, &fatal);

        // Whatever happened, the source directory returns to its original state.
        for file in &staged {
            remove_file_quietly(&file.path);
        }

        result
    }

    /// Parse every chart and assign output names.
    ///
    /// Returns one slot per chart (filled for charts excluded up front) and
    /// the tasks for the rest, each tagged with its slot index. A chart whose
    /// `AudioFilename` is not one of the set's audio tracks is excluded: its
    /// converted copy would point at a file that never gets written.
    fn plan_charts(
        &self,
        ctx: &JobContext,
        inventory: &SetInventory,
    ) -> (Vec<Option<ChartOutcome>>, Vec<(usize, ChartTask)>) {
        let charts = &inventory.charts;
        let audio_names: HashSet<String> = inventory.audio.iter().map(|p| file_name(p)).collect();
        let mut slots = vec![None; charts.len()];
        let mut tasks = Vec::new();
        let mut planned: HashSet<String> = HashSet::new();

        for (index, path) in charts.iter().enumerate() {
            let chart = match self.codec.parse(path) {
                Ok(chart) => chart,
                Err(e) => {
                    ctx.logger.warn(&format!("Excluding {}: {}", file_name(path), e));
                    slots[index] = Some(ChartOutcome::Excluded {
                        chart_name: file_stem(path),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if let Some(audio) = chart.audio_filename() {
                if !audio_names.contains(audio) {
                    let reason = format!("audio file {} is not converted", audio);
                    ctx.logger.warn(&format!("Excluding {}: {}", file_name(path), reason));
                    slots[index] = Some(ChartOutcome::Excluded {
                        chart_name: display_name(&chart, path),
                        reason,
                    });
                    continue;
                }
            }

            let target_name = converted_chart_name(&chart, &ctx.tag);
            let collides = planned.contains(&target_name) || ctx.source_path(&target_name).exists();
            if collides {
                ctx.logger.warn(&format!(
                    "Excluding {}: output name {} is already taken",
                    file_name(path),
                    target_name
                ));
                slots[index] = Some(ChartOutcome::Excluded {
                    chart_name: display_name(&chart, path),
                    reason: format!("output name {} is already taken", target_name),
                });
                continue;
            }

            planned.insert(target_name.clone());
            tasks.push((
                index,
                ChartTask {
                    source: path.clone(),
                    chart,
                    target_name,
                },
            ));
        }

        (slots, tasks)
    }

    /// Fan out one worker per file and wait for all of them.
    fn run_workers(
        &self,
        ctx: &JobContext,
        tasks: &[(usize, ChartTask)],
        inventory: &SetInventory,
        fatal: &AtomicBool,
        slots: &mut [Option<ChartOutcome>],
    ) -> Vec<AssetOutcome> {
        let codec = self.codec.as_ref();
        let stretcher = &self.stretcher;

        thread::scope(|s| {
            let chart_handles: Vec<_> = tasks
                .iter()
                .map(|(index, task)| (*index, task, s.spawn(move || workers::convert_chart(ctx, codec, task))))
                .collect();

            let asset_handles: Vec<_> = inventory
                .audio
                .iter()
                .map(|path| {
                    let handle = s.spawn(move || {
                        let outcome = workers::convert_audio(ctx, stretcher, path);
                        if outcome.is_failed() {
                            fatal.store(true, Ordering::SeqCst);
                        }
                        outcome
                    });
                    (AssetKind::Audio, path, handle)
                })
                .chain(inventory.storyboards.iter().map(|path| {
                    let handle = s.spawn(move || {
                        let outcome = workers::convert_storyboard(ctx, codec, path);
                        if outcome.is_failed() {
                            fatal.store(true, Ordering::SeqCst);
                        }
                        outcome
                    });
                    (AssetKind::Storyboard, path, handle)
                }))
                .collect();

            for (index, task, handle) in chart_handles {
                let outcome = handle.join().unwrap_or_else(|_| {
                    ctx.logger.error(&format!("Chart worker for {} panicked", file_name(&task.source)));
                    ChartOutcome::Excluded {
                        chart_name: task.display_name(),
                        reason: "worker panicked".to_string(),
                    }
                });
                slots[index] = Some(outcome);
            }

            asset_handles
                .into_iter()
                .map(|(kind, path, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        ctx.logger.error(&format!("{} worker for {} panicked", kind.label(), file_name(path)));
                        fatal.store(true, Ordering::SeqCst);
                        AssetOutcome::Failed {
                            kind,
                            source_name: file_name(path),
                            reason: "worker panicked".to_string(),
                        }
                    })
                })
                .collect()
        })
    }

    /// Decide between packaging and rollback after the join barrier.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        ctx: &JobContext,
        job: &ConversionJob,
        output_root: &Path,
        charts: &[ChartOutcome],
        assets: &[AssetOutcome],
        staged: &[StagedFile],
        fatal: &AtomicBool,
    ) -> ConvertResult<JobResult> {
        if ctx.cancel.is_cancelled() {
            return Err(JobError::cancelled(&ctx.job_name));
        }

        if fatal.load(Ordering::SeqCst) {
            let reason = assets
                .iter()
                .filter_map(|outcome| match outcome {
                    AssetOutcome::Failed {
                        kind,
                        source_name,
                        reason,
                    } => Some(format!("{} {}: {}", kind.label(), source_name, reason)),
                    AssetOutcome::Converted { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(JobError::AudioFailed {
                job_name: ctx.job_name.clone(),
                reason,
            });
        }

        let excluded = excluded_charts(charts.iter().cloned());
        let mut converted: Vec<String> = charts
            .iter()
            .filter_map(|outcome| match outcome {
                ChartOutcome::Converted { file, .. } => Some(file.final_name.clone()),
                ChartOutcome::Excluded { .. } => None,
            })
            .collect();
        converted.sort();

        if converted.is_empty() {
            return Err(JobError::NothingToConvert {
                job_name: ctx.job_name.clone(),
                excluded,
            });
        }

        ctx.logger.phase("Package");
        ctx.report_progress("Package", 80, "Packaging output");

        let request = PackageRequest {
            source_dir: ctx.source_dir(),
            output_root,
            name: &ctx.job_name,
            staged,
            archive: job.archive,
            job_id: &ctx.job_id,
        };
        let artifact_path = self
            .packager
            .package(&request)
            .map_err(|source| JobError::PackagingFailed {
                job_name: ctx.job_name.clone(),
                source,
            })?;

        Ok(JobResult {
            artifact_path,
            converted,
            excluded,
        })
    }
}

fn excluded_charts(outcomes: impl Iterator<Item = ChartOutcome>) -> Vec<ExcludedChart> {
    outcomes
        .filter_map(|outcome| match outcome {
            ChartOutcome::Excluded { chart_name, reason } => Some(ExcludedChart {
                name: chart_name,
                reason,
            }),
            ChartOutcome::Converted { .. } => None,
        })
        .collect()
}

/// Absolute form of a path that may not exist yet.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Directory the artifact is created in.
///
/// Output into the source directory itself goes to its parent; anything
/// nested deeper inside the source is refused, it would be copied into
/// its own output.
fn resolve_output_root(source_dir: &Path, output_dir: &Path) -> Result<PathBuf, &'static str> {
    let output = absolute(output_dir);
    if output == source_dir {
        return source_dir
            .parent()
            .map(Path::to_path_buf)
            .ok_or("source directory has no parent for the output");
    }
    if output.starts_with(source_dir) {
        return Err("output directory is inside the source directory");
    }
    Ok(output)
}

/// Claim on a source directory, released on drop.
struct ActiveJob<'a> {
    active: &'a Mutex<HashSet<PathBuf>>,
    dir: PathBuf,
}

impl<'a> ActiveJob<'a> {
    fn claim(active: &'a Mutex<HashSet<PathBuf>>, dir: &Path) -> Option<Self> {
        if !active.lock().insert(dir.to_path_buf()) {
            return None;
        }
        Some(Self {
            active,
            dir: dir.to_path_buf(),
        })
    }
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_tracing;
    use std::fs;
    use tempfile::tempdir;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        // Tests that reach the audio stage install their own tool.
        settings.audio.tool = "/nonexistent/soundstretch".to_string();
        settings
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(next_job_id(), next_job_id());
    }

    #[test]
    fn rate_of_one_is_rejected() {
        init_test_tracing();
        let dir = tempdir().unwrap();
        let changer = RateChanger::new(settings());
        let job = ConversionJob::new(dir.path(), 1.0, dir.path());

        let err = changer.convert(&job).unwrap_err();
        assert!(matches!(err, JobError::Validation { .. }));
    }

    #[test]
    fn empty_source_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bg.jpg"), b"img").unwrap();
        let changer = RateChanger::new(settings());
        let job = ConversionJob::new(dir.path(), 1.5, dir.path());

        let err = changer.convert(&job).unwrap_err();
        assert!(err.user_message().contains("no chart files"));
    }

    #[test]
    fn missing_source_is_rejected() {
        let dir = tempdir().unwrap();
        let changer = RateChanger::new(settings());
        let job = ConversionJob::new(dir.path().join("gone"), 1.5, dir.path());

        assert!(matches!(
            changer.convert(&job).unwrap_err(),
            JobError::Validation { .. }
        ));
    }

    #[test]
    fn output_inside_source_is_rejected() {
        let dir = tempdir().unwrap();
        let source = dir.path().canonicalize().unwrap();

        assert_eq!(resolve_output_root(&source, &source), Ok(source.parent().unwrap().to_path_buf()));
        assert!(resolve_output_root(&source, &source.join("out")).is_err());
        assert_eq!(
            resolve_output_root(&source.join("set"), &source),
            Ok(source.clone())
        );
    }

    #[test]
    fn claim_is_exclusive_until_dropped() {
        let active = Mutex::new(HashSet::new());
        let dir = PathBuf::from("/sets/a");

        let first = ActiveJob::claim(&active, &dir);
        assert!(first.is_some());
        assert!(ActiveJob::claim(&active, &dir).is_none());
        assert!(ActiveJob::claim(&active, Path::new("/sets/b")).is_some());

        drop(first);
        assert!(ActiveJob::claim(&active, &dir).is_some());
    }

    #[test]
    fn busy_source_is_refused() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.osu"), "osu file format v14\n").unwrap();
        let changer = RateChanger::new(settings());
        let source = dir.path().canonicalize().unwrap();

        let _held = ActiveJob::claim(&changer.active, &source).unwrap();
        let job = ConversionJob::new(dir.path(), 1.5, dir.path());
        assert!(matches!(
            changer.convert(&job).unwrap_err(),
            JobError::SourceBusy { .. }
        ));
    }

    #[test]
    fn unparseable_charts_mean_nothing_to_convert() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.osu"), "[General]\nno header\n").unwrap();
        let changer = RateChanger::new(settings());
        let job = ConversionJob::new(dir.path(), 1.5, dir.path());

        match changer.convert(&job).unwrap_err() {
            JobError::NothingToConvert { excluded, .. } => {
                assert_eq!(excluded.len(), 1);
                assert_eq!(excluded[0].name, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
