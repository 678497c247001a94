//! Filesystem helpers: filtered tree copy and moves across filesystems.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::error::{PackagingError, PackagingResult};

/// Prefix of files a worker is still writing.
pub const PARTIAL_PREFIX: &str = ".partial-";

/// Whether a file name belongs to an unfinished staged write.
pub fn is_partial_name(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX)
}

/// Whether a path's extension is one of `extensions` (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
}

/// Copy `source` into `dest` recursively, skipping files whose extension is
/// in `skip_extensions` and unfinished staged writes.
///
/// Returns the copied files relative to `source`, sorted.
pub fn copy_tree_filtered(
    source: &Path,
    dest: &Path,
    skip_extensions: &[String],
) -> PackagingResult<Vec<PathBuf>> {
    let mut copied = Vec::new();

    let walker = WalkDir::new(source)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source_err| PackagingError::Walk {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        let relative = match entry.path().strip_prefix(source) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };
        let target = dest.join(&relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| PackagingError::io_error("creating output subdirectory", e))?;
            continue;
        }

        if !entry.file_type().is_file() {
            tracing::debug!("Skipping non-regular file {}", entry.path().display());
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if is_partial_name(&name) || has_extension(entry.path(), skip_extensions) {
            continue;
        }

        fs::copy(entry.path(), &target)
            .map_err(|e| PackagingError::io_error(format!("copying {}", relative.display()), e))?;
        copied.push(relative);
    }

    Ok(copied)
}

/// Move a file, falling back to copy + remove across filesystems.
///
/// Fails if `to` already exists.
pub fn move_file(from: &Path, to: &Path) -> PackagingResult<()> {
    if to.exists() {
        return Err(PackagingError::TargetExists(to.to_path_buf()));
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).map_err(|e| PackagingError::io_error("copying staged file", e))?;
    fs::remove_file(from).map_err(|e| PackagingError::io_error("removing staged file", e))?;
    Ok(())
}

/// Remove a file if it exists, logging instead of failing.
pub fn remove_file_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Remove a directory tree if it exists, logging instead of failing.
pub fn remove_dir_quietly(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn copies_assets_and_skips_converted_formats() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();

        fs::write(src.path().join("bg.jpg"), b"img").unwrap();
        fs::write(src.path().join("song.MP3"), b"audio").unwrap();
        fs::write(src.path().join("a [Hard].osu"), b"chart").unwrap();
        fs::write(src.path().join("set.osb"), b"sb").unwrap();
        fs::write(src.path().join(".partial-x.osu"), b"half").unwrap();
        fs::create_dir(src.path().join("sb")).unwrap();
        fs::write(src.path().join("sb").join("star.png"), b"png").unwrap();

        let copied =
            copy_tree_filtered(src.path(), dst.path(), &exts(&["osu", "osb", "mp3"])).unwrap();

        assert_eq!(
            copied,
            vec![PathBuf::from("bg.jpg"), PathBuf::from("sb").join("star.png")]
        );
        assert!(dst.path().join("sb").join("star.png").is_file());
        assert!(!dst.path().join("song.MP3").exists());
        assert!(!dst.path().join(".partial-x.osu").exists());
    }

    #[test]
    fn move_file_refuses_existing_target() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        fs::write(&from, b"1").unwrap();
        fs::write(&to, b"2").unwrap();

        assert!(matches!(
            move_file(&from, &to),
            Err(PackagingError::TargetExists(_))
        ));
        assert!(from.exists());
    }

    #[test]
    fn move_file_moves() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("sub").join("a");
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(&from, b"1").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"1");
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("x.OSU"), &exts(&["osu"])));
        assert!(!has_extension(Path::new("osu"), &exts(&["osu"])));
    }
}
