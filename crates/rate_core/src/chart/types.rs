//! Core chart data structures.

use super::events::Events;
use super::hit_objects::HitObject;

/// Separator style used when writing a key/value section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `Key: Value` (General, Editor).
    ColonSpace,
    /// `Key:Value` (Metadata, Difficulty).
    Colon,
    /// `Key : Value` (Colours).
    Spaced,
}

impl Separator {
    /// The literal text placed between key and value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Separator::ColonSpace => ": ",
            Separator::Colon => ":",
            Separator::Spaced => " : ",
        }
    }
}

/// A single `Key: Value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// Ordered key/value section.
///
/// Order is preserved so that a parsed and re-written chart keeps its
/// original layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    pub entries: Vec<Property>,
    pub separator: Separator,
}

impl Properties {
    /// Create an empty section with the given separator style.
    pub fn new(separator: Separator) -> Self {
        Self {
            entries: Vec::new(),
            separator,
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Set a value, replacing in place or appending if absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|p| p.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Property {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// Append a value without checking for duplicates (parser use).
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Property {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Check whether the section has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Section names in the order they appeared in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionName {
    General,
    Editor,
    Metadata,
    Difficulty,
    Events,
    TimingPoints,
    Colours,
    HitObjects,
    /// Any other section, stored verbatim in `Chart::extra_sections`.
    Other(String),
}

impl SectionName {
    /// Map a header (without brackets) to a section name.
    pub fn from_header(name: &str) -> Self {
        match name {
            "General" => SectionName::General,
            "Editor" => SectionName::Editor,
            "Metadata" => SectionName::Metadata,
            "Difficulty" => SectionName::Difficulty,
            "Events" => SectionName::Events,
            "TimingPoints" => SectionName::TimingPoints,
            "Colours" => SectionName::Colours,
            "HitObjects" => SectionName::HitObjects,
            other => SectionName::Other(other.to_string()),
        }
    }

    /// The header text written between brackets.
    pub fn header(&self) -> &str {
        match self {
            SectionName::General => "General",
            SectionName::Editor => "Editor",
            SectionName::Metadata => "Metadata",
            SectionName::Difficulty => "Difficulty",
            SectionName::Events => "Events",
            SectionName::TimingPoints => "TimingPoints",
            SectionName::Colours => "Colours",
            SectionName::HitObjects => "HitObjects",
            SectionName::Other(name) => name,
        }
    }
}

/// A section the codec does not interpret (e.g. `[Variables]` in `.osb`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub name: String,
    pub lines: Vec<String>,
}

/// A timing point.
///
/// `beat_length` is milliseconds per beat when positive. Negative values
/// encode an inherited point (a slider velocity multiplier), not a duration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingPoint {
    pub offset: f64,
    pub beat_length: f64,
    /// Meter, sample set, sample index, volume, uninherited, effects.
    pub rest: Vec<String>,
}

impl TimingPoint {
    /// Whether this is an inherited (relative) timing point.
    pub fn is_inherited(&self) -> bool {
        self.beat_length < 0.0
    }
}

/// A parsed chart (one `.osu` difficulty, or an `.osb` storyboard).
///
/// All time values are milliseconds relative to the start of the track.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Format version from the header; `None` for storyboard files.
    pub format_version: Option<u32>,
    pub general: Properties,
    pub editor: Properties,
    pub metadata: Properties,
    pub difficulty: Properties,
    pub events: Events,
    pub timing_points: Vec<TimingPoint>,
    pub colours: Properties,
    pub hit_objects: Vec<HitObject>,
    pub extra_sections: Vec<RawSection>,
    pub section_order: Vec<SectionName>,
}

impl Default for Chart {
    fn default() -> Self {
        Self {
            format_version: None,
            general: Properties::new(Separator::ColonSpace),
            editor: Properties::new(Separator::ColonSpace),
            metadata: Properties::new(Separator::Colon),
            difficulty: Properties::new(Separator::Colon),
            events: Events::default(),
            timing_points: Vec::new(),
            colours: Properties::new(Separator::Spaced),
            hit_objects: Vec::new(),
            extra_sections: Vec::new(),
            section_order: Vec::new(),
        }
    }
}

/// Value of `BeatmapID` for a chart that has no online identity.
pub const UNASSIGNED_BEATMAP_ID: i64 = -1;

impl Chart {
    /// Create an empty chart.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artist(&self) -> &str {
        self.metadata.get("Artist").unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.metadata.get("Title").unwrap_or_default()
    }

    pub fn creator(&self) -> &str {
        self.metadata.get("Creator").unwrap_or_default()
    }

    /// Difficulty name.
    pub fn version(&self) -> &str {
        self.metadata.get("Version").unwrap_or_default()
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.metadata.set("Version", version);
    }

    /// Online beatmap ID, if present and numeric.
    pub fn beatmap_id(&self) -> Option<i64> {
        self.metadata.get("BeatmapID").and_then(|v| v.parse().ok())
    }

    pub fn set_beatmap_id(&mut self, id: i64) {
        self.metadata.set("BeatmapID", id.to_string());
    }

    /// Audio file referenced by this chart.
    pub fn audio_filename(&self) -> Option<&str> {
        self.general
            .get("AudioFilename")
            .filter(|name| !name.is_empty())
    }

    pub fn set_audio_filename(&mut self, name: impl Into<String>) {
        self.general.set("AudioFilename", name);
    }

    /// Song preview start time (`-1` when unset).
    pub fn preview_time(&self) -> Option<i32> {
        self.general.get("PreviewTime").and_then(|v| v.parse().ok())
    }

    pub fn set_preview_time(&mut self, time: i32) {
        self.general.set("PreviewTime", time.to_string());
    }

    /// Editor bookmarks.
    pub fn bookmarks(&self) -> Vec<i32> {
        self.editor
            .get("Bookmarks")
            .map(|v| {
                v.split(',')
                    .filter_map(|b| b.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_bookmarks(&mut self, bookmarks: &[i32]) {
        let joined = bookmarks
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.editor.set("Bookmarks", joined);
    }

    /// Whether the editor section carries a bookmarks entry.
    pub fn has_bookmarks(&self) -> bool {
        self.editor.get("Bookmarks").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_set_replaces_in_place() {
        let mut props = Properties::new(Separator::Colon);
        props.push("Title", "Song");
        props.push("Version", "Hard");

        props.set("Title", "Other");
        props.set("BeatmapID", "-1");

        assert_eq!(props.entries.len(), 3);
        assert_eq!(props.entries[0].value, "Other");
        assert_eq!(props.entries[2].key, "BeatmapID");
    }

    #[test]
    fn bookmarks_round_trip_through_editor() {
        let mut chart = Chart::new();
        assert!(!chart.has_bookmarks());

        chart.set_bookmarks(&[100, 2000, 30000]);
        assert_eq!(chart.bookmarks(), vec![100, 2000, 30000]);
        assert_eq!(chart.editor.get("Bookmarks"), Some("100,2000,30000"));
    }

    #[test]
    fn section_names_map_both_ways() {
        assert_eq!(SectionName::from_header("HitObjects"), SectionName::HitObjects);
        assert_eq!(
            SectionName::from_header("Variables"),
            SectionName::Other("Variables".to_string())
        );
        assert_eq!(SectionName::Other("Variables".into()).header(), "Variables");
    }

    #[test]
    fn empty_audio_filename_is_none() {
        let mut chart = Chart::new();
        chart.set_audio_filename("");
        assert!(chart.audio_filename().is_none());
    }
}
