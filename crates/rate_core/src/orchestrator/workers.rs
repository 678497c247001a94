//! Per-file workers.
//!
//! A worker converts one file and reports an outcome value; it never
//! returns an error past its boundary. Output is written to a hidden
//! `.partial-<name>` file in the source directory and renamed to its final
//! name only when complete, so later steps never see a half-written file.
//! On failure the partial file is removed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::AudioStretcher;
use crate::chart::{Chart, ChartCodec};
use crate::models::{AssetKind, AssetOutcome, ChartOutcome, StagedFile};
use crate::packaging::{remove_file_quietly, PARTIAL_PREFIX};
use crate::rate::{rescale_chart, rescale_storyboard, suffixed_file_name};

use super::inventory::file_name;
use super::types::JobContext;

/// A parsed chart scheduled for conversion.
#[derive(Debug, Clone)]
pub struct ChartTask {
    pub source: PathBuf,
    pub chart: Chart,
    /// Converted file name, already checked for collisions.
    pub target_name: String,
}

impl ChartTask {
    /// Name used when reporting this chart: its difficulty name, or the
    /// file stem for charts without one.
    pub fn display_name(&self) -> String {
        display_name(&self.chart, &self.source)
    }
}

/// Difficulty name of a chart, falling back to the file stem.
pub fn display_name(chart: &Chart, path: &Path) -> String {
    let version = chart.version();
    if version.is_empty() {
        super::inventory::file_stem(path)
    } else {
        version.to_string()
    }
}

/// Hidden path a worker writes to before the final rename.
pub fn partial_path(dir: &Path, final_name: &str) -> PathBuf {
    dir.join(format!("{}{}", PARTIAL_PREFIX, final_name))
}

/// Move a finished partial file to `target`, refusing to overwrite.
fn finish(partial: &Path, target: &Path) -> Result<(), String> {
    if target.exists() {
        return Err(format!("{} already exists", file_name(target)));
    }
    fs::rename(partial, target).map_err(|e| format!("failed to finalize output: {}", e))
}

/// Run `write` against a fresh partial path, then finalize to `target`.
fn staged_write<F>(ctx: &JobContext, target: &Path, write: F) -> Result<(), String>
where
    F: FnOnce(&Path) -> Result<(), String>,
{
    let partial = partial_path(ctx.source_dir(), &file_name(target));
    // Left over from an interrupted run; ours by name.
    remove_file_quietly(&partial);

    let result = write(&partial).and_then(|()| finish(&partial, target));
    if result.is_err() {
        remove_file_quietly(&partial);
    }
    result
}

/// Convert one chart. Any failure excludes the chart only.
pub fn convert_chart(ctx: &JobContext, codec: &dyn ChartCodec, task: &ChartTask) -> ChartOutcome {
    let source_name = file_name(&task.source);
    let excluded = |reason: String| {
        ctx.logger
            .warn(&format!("Excluding {}: {}", source_name, reason));
        ChartOutcome::Excluded {
            chart_name: task.display_name(),
            reason,
        }
    };

    let converted = match rescale_chart(&task.chart, &ctx.tag) {
        Ok(chart) => chart,
        Err(e) => return excluded(e.to_string()),
    };

    let target = ctx.source_path(&task.target_name);
    let written = staged_write(ctx, &target, |partial| {
        codec.serialize(&converted, partial).map_err(|e| e.to_string())
    });

    match written {
        Ok(()) => {
            ctx.logger
                .debug(&format!("Converted {} -> {}", source_name, task.target_name));
            ChartOutcome::Converted {
                source_name,
                file: StagedFile::new(target, task.target_name.clone()),
            }
        }
        Err(reason) => excluded(reason),
    }
}

/// Stretch one audio track. Failure is fatal to the job.
pub fn convert_audio(ctx: &JobContext, stretcher: &AudioStretcher, source: &Path) -> AssetOutcome {
    let source_name = file_name(source);
    let target_name = suffixed_file_name(&source_name, &ctx.tag);
    let target = ctx.source_path(&target_name);

    let written = staged_write(ctx, &target, |partial| {
        stretcher
            .stretch(source, partial, &ctx.tag, &ctx.cancel, &ctx.logger)
            .map_err(|e| e.to_string())
    });

    asset_outcome(ctx, AssetKind::Audio, source_name, written, || {
        StagedFile::new(target.clone(), target_name.clone())
    })
}

/// Rescale one storyboard file. Failure is fatal to the job.
///
/// The converted copy is staged under a rate-suffixed name and keeps its
/// original name in the output, where the charts look for it.
pub fn convert_storyboard(ctx: &JobContext, codec: &dyn ChartCodec, source: &Path) -> AssetOutcome {
    let source_name = file_name(source);
    let staged_name = suffixed_file_name(&source_name, &ctx.tag);
    let target = ctx.source_path(&staged_name);

    let written = codec
        .parse(source)
        .map_err(|e| e.to_string())
        .and_then(|storyboard| {
            let converted = rescale_storyboard(&storyboard, ctx.tag.rate());
            staged_write(ctx, &target, |partial| {
                codec.serialize(&converted, partial).map_err(|e| e.to_string())
            })
        });

    asset_outcome(ctx, AssetKind::Storyboard, source_name.clone(), written, || {
        StagedFile::new(target.clone(), source_name.clone())
    })
}

fn asset_outcome<F>(
    ctx: &JobContext,
    kind: AssetKind,
    source_name: String,
    written: Result<(), String>,
    staged: F,
) -> AssetOutcome
where
    F: FnOnce() -> StagedFile,
{
    match written {
        Ok(()) => {
            ctx.logger
                .debug(&format!("Converted {} {}", kind.label(), source_name));
            AssetOutcome::Converted {
                kind,
                source_name,
                file: staged(),
            }
        }
        Err(reason) => {
            ctx.logger
                .error(&format!("Failed to convert {} {}: {}", kind.label(), source_name, reason));
            AssetOutcome::Failed {
                kind,
                source_name,
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{parse_chart, OsuCodec};
    use crate::logging::{JobLogger, LogConfig};
    use crate::orchestrator::CancelHandle;
    use crate::rate::RateTag;
    use std::sync::Arc;
    use tempfile::tempdir;

    const CHART: &str = "osu file format v14\n\n[General]\nAudioFilename: audio.mp3\n\n[Metadata]\nTitle:T\nArtist:A\nCreator:C\nVersion:Hard\n\n[HitObjects]\n256,192,1500,1,0\n";

    fn context(dir: &Path) -> JobContext {
        JobContext::new(
            "test",
            "set x1.5",
            dir.to_path_buf(),
            RateTag::new(1.5, false).unwrap(),
            Arc::new(JobLogger::detached("set x1.5", LogConfig::default(), None)),
            CancelHandle::new(),
        )
    }

    fn task(dir: &Path, content: &str) -> ChartTask {
        let source = dir.join("A - T (C) [Hard].osu");
        fs::write(&source, content).unwrap();
        ChartTask {
            source,
            chart: parse_chart(content).unwrap(),
            target_name: "A - T (C) [Hard x1.5].osu".to_string(),
        }
    }

    #[test]
    fn chart_worker_writes_final_file() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let task = task(dir.path(), CHART);

        let outcome = convert_chart(&ctx, &OsuCodec, &task);
        let ChartOutcome::Converted { file, .. } = outcome else {
            panic!("chart was not converted");
        };

        let written = fs::read_to_string(&file.path).unwrap();
        assert!(written.contains("256,192,1000,1,0"));
        assert!(written.contains("AudioFilename: audio_1.5.mp3"));
        assert!(!partial_path(dir.path(), &file.final_name).exists());
    }

    #[test]
    fn unknown_hit_object_excludes_chart() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let task = task(dir.path(), &format!("{}256,192,2000,64,0\n", CHART));

        let outcome = convert_chart(&ctx, &OsuCodec, &task);
        match outcome {
            ChartOutcome::Excluded { chart_name, reason } => {
                assert_eq!(chart_name, "Hard");
                assert!(reason.contains("Unsupported hit object"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn existing_target_is_not_overwritten() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let task = task(dir.path(), CHART);
        let target = dir.path().join(&task.target_name);
        fs::write(&target, b"keep me").unwrap();

        let outcome = convert_chart(&ctx, &OsuCodec, &task);
        assert!(!outcome.is_converted());
        assert_eq!(fs::read(&target).unwrap(), b"keep me");
        assert!(!partial_path(dir.path(), &task.target_name).exists());
    }

    #[test]
    fn storyboard_keeps_original_final_name() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let source = dir.path().join("set.osb");
        fs::write(&source, "[Events]\nSample,3000,0,\"clap.wav\",80\n").unwrap();

        let outcome = convert_storyboard(&ctx, &OsuCodec, &source);
        let staged = outcome.staged().unwrap();
        assert_eq!(staged.final_name, "set.osb");
        assert_eq!(staged.path, dir.path().join("set_1.5.osb"));
        assert!(fs::read_to_string(&staged.path)
            .unwrap()
            .contains("Sample,2000,0,\"clap.wav\",80"));
    }

    #[test]
    fn audio_failure_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let source = dir.path().join("audio.mp3");
        fs::write(&source, b"mp3").unwrap();

        let stretcher = AudioStretcher::new(dir.path().join("missing-tool"));
        let outcome = convert_audio(&ctx, &stretcher, &source);

        assert!(outcome.is_failed());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
