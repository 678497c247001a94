//! Zip archives (`.osz` is a renamed zip).
//!
//! Archives are written deterministically: entries sorted by path, `/`
//! separators, fixed timestamps. Converting the same set twice yields
//! byte-identical archives.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::copy::remove_file_quietly;
use super::error::{PackagingError, PackagingResult};

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

/// Entry name for a path relative to the archive root.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compress the contents of `source_dir` into `archive_path`.
///
/// The archive is written next to its target under a temporary name and
/// moved into place at the end. With `overwrite`, an existing archive is
/// replaced; without it, an existing archive is an error.
pub fn create_archive(source_dir: &Path, archive_path: &Path, overwrite: bool) -> PackagingResult<()> {
    if archive_path.exists() && !overwrite {
        return Err(PackagingError::TargetExists(archive_path.to_path_buf()));
    }

    let temp_path = partial_path(archive_path);
    let result = write_archive(source_dir, &temp_path).and_then(|()| {
        if archive_path.exists() {
            fs::remove_file(archive_path)
                .map_err(|e| PackagingError::io_error("replacing existing archive", e))?;
        }
        fs::rename(&temp_path, archive_path)
            .map_err(|e| PackagingError::io_error("moving archive into place", e))
    });

    if result.is_err() {
        remove_file_quietly(&temp_path);
    }
    result
}

fn partial_path(archive_path: &Path) -> PathBuf {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    archive_path.with_file_name(format!(".{}.partial", name))
}

fn write_archive(source_dir: &Path, archive_path: &Path) -> PackagingResult<()> {
    let file =
        File::create(archive_path).map_err(|e| PackagingError::io_error("creating archive", e))?;
    let mut zip = ZipWriter::new(file);
    let options = entry_options();

    let walker = WalkDir::new(source_dir).min_depth(1).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|source| PackagingError::Walk {
            path: source_dir.to_path_buf(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(source_dir) else {
            continue;
        };
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)
                .map_err(|e| PackagingError::archive_error("adding directory", e))?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)
                .map_err(|e| PackagingError::archive_error("starting entry", e))?;
            let mut input = File::open(entry.path())
                .map_err(|e| PackagingError::io_error("reading file for archive", e))?;
            io::copy(&mut input, &mut zip)
                .map_err(|e| PackagingError::io_error("writing archive entry", e))?;
        }
    }

    let mut file = zip
        .finish()
        .map_err(|e| PackagingError::archive_error("finishing archive", e))?;
    file.sync_all()
        .map_err(|e| PackagingError::io_error("flushing archive", e))?;
    Ok(())
}

/// Unpack `archive_path` into `dest`, returning the extracted file paths.
///
/// Entries with absolute paths or `..` components are rejected before
/// anything is written for them.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> PackagingResult<Vec<PathBuf>> {
    let file =
        File::open(archive_path).map_err(|e| PackagingError::io_error("opening archive", e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| PackagingError::archive_error("reading archive", e))?;

    fs::create_dir_all(dest).map_err(|e| PackagingError::io_error("creating extract directory", e))?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| PackagingError::archive_error("reading entry", e))?;

        let relative = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => return Err(PackagingError::UnsafeEntry(entry.name().to_string())),
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| PackagingError::io_error("creating extracted directory", e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PackagingError::io_error("creating extracted directory", e))?;
        }
        let mut output =
            File::create(&target).map_err(|e| PackagingError::io_error("writing extracted file", e))?;
        io::copy(&mut entry, &mut output)
            .map_err(|e| PackagingError::io_error("writing extracted file", e))?;
        extracted.push(target);
    }

    Ok(extracted)
}

/// File entry names of an archive, in archive order.
pub fn list_archive(archive_path: &Path) -> PackagingResult<Vec<String>> {
    let file =
        File::open(archive_path).map_err(|e| PackagingError::io_error("opening archive", e))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| PackagingError::archive_error("reading archive", e))?;

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| PackagingError::archive_error("reading entry", e))?;
        if !entry.is_dir() {
            names.push(entry.name().to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn sample_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.osu"), b"chart").unwrap();
        fs::write(dir.path().join("a.jpg"), b"image").unwrap();
        fs::create_dir(dir.path().join("sb")).unwrap();
        fs::write(dir.path().join("sb").join("x.png"), b"png").unwrap();
        dir
    }

    #[test]
    fn archive_round_trips_contents() {
        let src = sample_dir();
        let out = tempdir().unwrap();
        let archive = out.path().join("set.osz");

        create_archive(src.path(), &archive, false).unwrap();
        assert_eq!(
            list_archive(&archive).unwrap(),
            vec!["a.jpg", "b.osu", "sb/x.png"]
        );

        let unpacked = out.path().join("unpacked");
        let files = extract_archive(&archive, &unpacked).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(fs::read(unpacked.join("sb").join("x.png")).unwrap(), b"png");
        assert!(!out.path().join(".set.osz.partial").exists());
    }

    #[test]
    fn archives_are_deterministic() {
        let src = sample_dir();
        let out = tempdir().unwrap();
        let first = out.path().join("1.osz");
        let second = out.path().join("2.osz");

        create_archive(src.path(), &first, false).unwrap();
        create_archive(src.path(), &second, false).unwrap();
        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn overwrite_flag_controls_replacement() {
        let src = sample_dir();
        let out = tempdir().unwrap();
        let archive = out.path().join("set.osz");
        fs::write(&archive, b"old").unwrap();

        assert!(matches!(
            create_archive(src.path(), &archive, false),
            Err(PackagingError::TargetExists(_))
        ));
        create_archive(src.path(), &archive, true).unwrap();
        assert_eq!(list_archive(&archive).unwrap().len(), 3);
    }

    #[test]
    fn rejects_entries_escaping_destination() {
        let out = tempdir().unwrap();
        let archive = out.path().join("evil.osz");
        {
            let mut zip = ZipWriter::new(File::create(&archive).unwrap());
            zip.start_file("../evil.txt", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"gotcha").unwrap();
            zip.finish().unwrap();
        }

        let dest = out.path().join("dest");
        let result = extract_archive(&archive, &dest);
        assert!(matches!(result, Err(PackagingError::UnsafeEntry(_))));
        assert!(!out.path().join("evil.txt").exists());
    }
}
