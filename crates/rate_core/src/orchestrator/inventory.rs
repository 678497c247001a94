//! Source directory scan.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::chart::{CHART_EXTENSION, STORYBOARD_EXTENSION};
use crate::packaging::{has_extension, is_partial_name};

/// Files of a beatmap set that get converted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetInventory {
    pub charts: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    pub storyboards: Vec<PathBuf>,
}

impl SetInventory {
    /// Scan the top level of `dir`. Each list is sorted by file name.
    ///
    /// Subdirectories and unfinished staged writes are ignored.
    pub fn scan(dir: &Path, audio_extensions: &[String]) -> io::Result<Self> {
        let chart_ext = [CHART_EXTENSION.to_string()];
        let storyboard_ext = [STORYBOARD_EXTENSION.to_string()];

        let mut inventory = Self::default();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if is_partial_name(&entry.file_name().to_string_lossy()) {
                continue;
            }

            let path = entry.path();
            if has_extension(&path, &chart_ext) {
                inventory.charts.push(path);
            } else if has_extension(&path, &storyboard_ext) {
                inventory.storyboards.push(path);
            } else if has_extension(&path, audio_extensions) {
                inventory.audio.push(path);
            }
        }

        inventory.charts.sort();
        inventory.audio.sort();
        inventory.storyboards.sort();
        Ok(inventory)
    }
}

/// File name of a path as a string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// File stem of a path as a string.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
