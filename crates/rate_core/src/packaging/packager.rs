//! Output assembly with all-or-nothing semantics.
//!
//! Everything is built in a hidden staging directory next to the target
//! (`.<name>.<job id>.partial`) and only moved into place at the end, so
//! a failed packaging phase leaves no new artifact and never destroys a
//! previous one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::StagedFile;

use super::archive::create_archive;
use super::copy::{copy_tree_filtered, move_file, remove_dir_quietly};
use super::error::{PackagingError, PackagingResult};

/// What to package for one job.
#[derive(Debug, Clone)]
pub struct PackageRequest<'a> {
    /// Source set; unconverted assets are copied from here.
    pub source_dir: &'a Path,
    /// Directory the artifact is created in.
    pub output_root: &'a Path,
    /// Artifact name without archive extension.
    pub name: &'a str,
    /// Converted files to move into the output.
    pub staged: &'a [StagedFile],
    /// Compress the output into an archive.
    pub archive: bool,
    /// Unique job identifier, keeps concurrent staging dirs apart.
    pub job_id: &'a str,
}

/// Builds the output directory or archive for a converted set.
#[derive(Debug, Clone)]
pub struct Packager {
    /// Extensions replaced by converted files (charts, storyboards, audio).
    skip_extensions: Vec<String>,
    archive_extension: String,
}

impl Packager {
    pub fn new(skip_extensions: Vec<String>, archive_extension: impl Into<String>) -> Self {
        Self {
            skip_extensions,
            archive_extension: archive_extension.into(),
        }
    }

    /// Path the artifact for `request` ends up at.
    pub fn artifact_path(&self, request: &PackageRequest<'_>) -> PathBuf {
        if request.archive {
            request
                .output_root
                .join(format!("{}.{}", request.name, self.archive_extension))
        } else {
            request.output_root.join(request.name)
        }
    }

    /// Assemble the output and return the artifact path.
    ///
    /// An existing artifact of the same name is replaced. On error every
    /// file this call created is removed.
    pub fn package(&self, request: &PackageRequest<'_>) -> PackagingResult<PathBuf> {
        fs::create_dir_all(request.output_root)
            .map_err(|e| PackagingError::io_error("creating output directory", e))?;

        let staging = request
            .output_root
            .join(format!(".{}.{}.partial", request.name, request.job_id));
        remove_dir_quietly(&staging);

        let result = self.assemble(request, &staging);
        if result.is_err() {
            remove_dir_quietly(&staging);
        }
        result
    }

    fn assemble(&self, request: &PackageRequest<'_>, staging: &Path) -> PackagingResult<PathBuf> {
        fs::create_dir(staging)
            .map_err(|e| PackagingError::io_error("creating staging directory", e))?;

        let copied = copy_tree_filtered(request.source_dir, staging, &self.skip_extensions)?;
        tracing::debug!("Copied {} unchanged assets", copied.len());

        for file in request.staged {
            move_file(&file.path, &staging.join(&file.final_name))?;
        }

        let target = self.artifact_path(request);
        if request.archive {
            create_archive(staging, &target, true)?;
            remove_dir_quietly(staging);
        } else {
            if target.exists() {
                fs::remove_dir_all(&target)
                    .map_err(|e| PackagingError::io_error("replacing existing output", e))?;
            }
            fs::rename(staging, &target)
                .map_err(|e| PackagingError::io_error("moving output into place", e))?;
        }

        tracing::info!("Packaged {}", target.display());
        Ok(target)
    }
}
