//! Rate tags and derived file names.
//!
//! Every artifact of a conversion is named after the rate:
//!
//! ```text
//! chart:      Artist - Title (Creator) [Hard x1.5].osu
//! version:    Hard x1.5
//! audio:      audio_1.5.mp3
//! output dir: 123 Artist - Title x1.5
//! ```
//!
//! Pitch-shift conversions append `_P` to every suffix.

use std::path::Path;

use super::error::{TransformError, TransformResult};

/// Characters that cannot appear in file names on common filesystems.
const INVALID_FILE_NAME_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// A validated rate plus the naming mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTag {
    rate: f64,
    pitch_shift: bool,
}

impl RateTag {
    /// Create a tag.
    ///
    /// The rate must be finite, positive and different from 1.
    pub fn new(rate: f64, pitch_shift: bool) -> TransformResult<Self> {
        if !rate.is_finite() || rate <= 0.0 || rate == 1.0 {
            return Err(TransformError::InvalidRate(rate));
        }
        Ok(Self { rate, pitch_shift })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn pitch_shift(&self) -> bool {
        self.pitch_shift
    }

    /// `1.5` or `1.5_P`.
    pub fn suffix(&self) -> String {
        let mut suffix = format_rate(self.rate);
        if self.pitch_shift {
            suffix.push_str("_P");
        }
        suffix
    }

    /// Suffix appended to display strings: ` x1.5`.
    pub fn display_suffix(&self) -> String {
        format!(" x{}", self.suffix())
    }
}

/// Shortest decimal form of a rate (`1.5`, `2`, `0.75`).
pub fn format_rate(rate: f64) -> String {
    format!("{}", rate)
}

/// Remove characters that are not allowed in file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !INVALID_FILE_NAME_CHARS.contains(c))
        .collect()
}

/// Difficulty name of the converted chart.
pub fn converted_version(version: &str, tag: &RateTag) -> String {
    format!("{}{}", version, tag.display_suffix())
}

/// File name of a converted chart.
pub fn chart_file_name(
    artist: &str,
    title: &str,
    creator: &str,
    version: &str,
    tag: &RateTag,
) -> String {
    sanitize_file_name(&format!(
        "{} - {} ({}) [{}].osu",
        artist,
        title,
        creator,
        converted_version(version, tag)
    ))
}

/// Insert the rate suffix before the extension: `audio.mp3` -> `audio_1.5.mp3`.
pub fn suffixed_file_name(file_name: &str, tag: &RateTag) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());

    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, tag.suffix(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, tag.suffix()),
    }
}

/// Name of the output directory (and archive stem) for a beatmap set.
pub fn output_dir_name(source_dir_name: &str, tag: &RateTag) -> String {
    sanitize_file_name(&format!("{}{}", source_dir_name, tag.display_suffix()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(rate: f64) -> RateTag {
        RateTag::new(rate, false).unwrap()
    }

    #[test]
    fn rejects_invalid_rates() {
        assert!(RateTag::new(1.0, false).is_err());
        assert!(RateTag::new(0.0, false).is_err());
        assert!(RateTag::new(-1.5, false).is_err());
        assert!(RateTag::new(f64::NAN, false).is_err());
        assert!(RateTag::new(f64::INFINITY, false).is_err());
        assert!(RateTag::new(1.5, false).is_ok());
    }

    #[test]
    fn formats_rate_shortest() {
        assert_eq!(format_rate(1.5), "1.5");
        assert_eq!(format_rate(2.0), "2");
        assert_eq!(format_rate(0.75), "0.75");
        assert_eq!(tag(1.25).suffix(), "1.25");
        assert_eq!(RateTag::new(1.25, true).unwrap().suffix(), "1.25_P");
    }

    #[test]
    fn chart_file_name_strips_invalid_chars() {
        let name = chart_file_name("AC/DC", "What?", "Map:per", "Hard", &tag(1.5));
        assert_eq!(name, "ACDC - What (Mapper) [Hard x1.5].osu");
    }

    #[test]
    fn suffixed_file_name_keeps_extension() {
        assert_eq!(suffixed_file_name("audio.mp3", &tag(1.5)), "audio_1.5.mp3");
        assert_eq!(
            suffixed_file_name("my.song.ogg", &RateTag::new(0.8, true).unwrap()),
            "my.song_0.8_P.ogg"
        );
        assert_eq!(suffixed_file_name("noext", &tag(2.0)), "noext_2");
    }

    #[test]
    fn output_dir_name_uses_display_suffix() {
        assert_eq!(
            output_dir_name("123 Artist - Title", &tag(1.5)),
            "123 Artist - Title x1.5"
        );
    }
}
