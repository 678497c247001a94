//! osu-rate - convert a beatmap set to a different playback rate.
//!
//! ```text
//! osu-rate "Songs/123 Artist - Title" --rate 1.5
//! osu-rate upload.osz --rate 0.8 --pitch --output out --no-archive
//! osu-rate --set-tool /opt/soundtouch/bin/soundstretch
//! ```

use std::path::{Path, PathBuf};
use std::process::{self, ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rate_core::config::{ConfigManager, ConfigSection};
use rate_core::logging::init_tracing;
use rate_core::packaging::{extract_archive, remove_dir_quietly};
use rate_core::{ConversionJob, RateChanger};

/// Command-line arguments for osu-rate
#[derive(Parser, Debug)]
#[command(name = "osu-rate")]
#[command(about = "Convert an osu! beatmap set to a different playback rate")]
#[command(version)]
struct Args {
    /// Beatmap set directory or .osz archive
    #[arg(required_unless_present = "set_tool", requires = "rate")]
    source: Option<PathBuf>,

    /// Playback rate, e.g. 1.5 or 0.75
    #[arg(short, long, requires = "source")]
    rate: Option<f64>,

    /// Directory to write the result into (default: paths.output_folder)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a loose directory instead of an archive
    #[arg(long)]
    no_archive: bool,

    /// Change pitch along with speed
    #[arg(long)]
    pitch: bool,

    /// Config file
    #[arg(short, long, default_value = ".config/osu-rate.toml")]
    config: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Save the time-stretch program to the config file
    #[arg(long, value_name = "PROGRAM")]
    set_tool: Option<String>,
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mut config = ConfigManager::new(&args.config);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    config
        .ensure_dirs_exist()
        .context("Failed to create configured directories")?;

    if let Some(tool) = &args.set_tool {
        config.settings_mut().audio.tool = tool.clone();
        config
            .update_section(ConfigSection::Audio)
            .context("Failed to save audio settings")?;
        println!("Audio tool set to {}", tool);
    }
    let (Some(source_arg), Some(rate)) = (args.source.clone(), args.rate) else {
        return Ok(ExitCode::SUCCESS);
    };

    let settings = config.settings().clone();
    init_tracing(settings.logging.level);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.paths.output_folder));
    let archive = settings.packaging.archive && !args.no_archive;

    let (source, unpacked) = if source_arg.is_file() {
        let dir = unpack(&source_arg, Path::new(&settings.paths.work_folder))?;
        (dir.clone(), Some(dir))
    } else {
        (source_arg, None)
    };

    let job = ConversionJob::new(&source, rate, output)
        .with_archive(archive)
        .with_pitch_shift(args.pitch);
    info!("Converting {} at {}x", source.display(), rate);

    let changer = RateChanger::new(settings);
    let result = changer.convert(&job);

    if let Some(dir) = unpacked {
        if let Some(parent) = dir.parent() {
            remove_dir_quietly(parent);
        }
    }

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        println!("{}", result.artifact_path.display());
        if let Some(note) = result.excluded_note() {
            eprintln!("{}", note);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Unpack an uploaded archive into `<work>/<pid>/<archive stem>`.
fn unpack(archive: &Path, work_folder: &Path) -> Result<PathBuf> {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .context("Archive path has no file name")?;
    let job_dir = work_folder.join(process::id().to_string());
    let dir = job_dir.join(stem);

    if let Err(e) = extract_archive(archive, &dir) {
        remove_dir_quietly(&job_dir);
        return Err(e).with_context(|| format!("Failed to unpack {}", archive.display()));
    }
    info!("Unpacked {} into {}", archive.display(), dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arguments() {
        let args = Args::parse_from(["osu-rate", "set", "--rate", "1.5", "--no-archive", "--pitch"]);
        assert_eq!(args.source, Some(PathBuf::from("set")));
        assert_eq!(args.rate, Some(1.5));
        assert!(args.no_archive);
        assert!(args.pitch);
        assert!(args.output.is_none());
    }

    #[test]
    fn rate_is_required() {
        assert!(Args::try_parse_from(["osu-rate", "set"]).is_err());
        assert!(Args::try_parse_from(["osu-rate"]).is_err());
    }

    #[test]
    fn set_tool_runs_without_a_job() {
        let args = Args::try_parse_from(["osu-rate", "--set-tool", "/opt/stretch"]).unwrap();
        assert_eq!(args.set_tool.as_deref(), Some("/opt/stretch"));
        assert!(args.source.is_none());
    }

    #[test]
    fn set_tool_persists_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("osu-rate.toml");
        let root = dir.path().display();
        std::fs::write(
            &config,
            format!(
                "[paths]\noutput_folder = \"{root}/out\"\nwork_folder = \"{root}/work\"\nlogs_folder = \"{root}/logs\"\n"
            ),
        )
        .unwrap();
        let args = Args::parse_from([
            "osu-rate",
            "--config",
            config.to_str().unwrap(),
            "--set-tool",
            "/opt/stretch",
        ]);

        run(args).unwrap();
        let mut reloaded = ConfigManager::new(&config);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().audio.tool, "/opt/stretch");
    }

    #[test]
    fn failed_unpack_leaves_no_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("upload.osz");
        std::fs::write(&archive, b"not a zip").unwrap();
        let work = dir.path().join("work");

        assert!(unpack(&archive, &work).is_err());
        assert!(!work.join(process::id().to_string()).exists());
    }
}
