//! Chart (beatmap difficulty) model and codec.
//!
//! The rest of the crate only depends on [`ChartCodec`]: parse a file into
//! a [`Chart`], and serialize a [`Chart`] back to disk. [`OsuCodec`] is the
//! implementation for the osu! text format and is also used for `.osb`
//! storyboard files, which share the `[Events]` syntax.
//!
//! # Components
//!
//! - **types**: Chart, key/value sections, timing points
//! - **events**: breaks, storyboard objects and commands, samples
//! - **hit_objects**: the hit object sum type and its `Timed` capability
//! - **parser** / **writer**: text format
//!
//! # Usage
//!
//! ```ignore
//! use rate_core::chart::{ChartCodec, OsuCodec};
//!
//! let codec = OsuCodec;
//! let chart = codec.parse(Path::new("set/song [Hard].osu"))?;
//! println!("{} - {} [{}]", chart.artist(), chart.title(), chart.version());
//! codec.serialize(&chart, Path::new("set/copy.osu"))?;
//! ```

mod error;
pub mod events;
pub mod hit_objects;
mod parser;
mod types;
mod writer;

use std::fs;
use std::path::Path;

pub use error::{ChartError, ChartResult};
pub use events::{
    BreakPeriod, CommandLayout, EventEntry, Events, ObjectKind, SampleSound, StoryboardCommand,
    StoryboardObject,
};
pub use hit_objects::{
    Circle, HitObject, HitObjectBase, LongNote, Slider, Spinner, Timed, UnknownHitObject,
};
pub use parser::parse_chart;
pub use types::{
    Chart, Properties, Property, RawSection, SectionName, Separator, TimingPoint,
    UNASSIGNED_BEATMAP_ID,
};
pub use writer::{format_float, write_chart};

/// Extension of chart files.
pub const CHART_EXTENSION: &str = "osu";
/// Extension of storyboard files.
pub const STORYBOARD_EXTENSION: &str = "osb";

/// Parse/serialize contract for chart files.
pub trait ChartCodec: Send + Sync {
    /// Read and parse a chart file.
    fn parse(&self, path: &Path) -> ChartResult<Chart>;

    /// Serialize a chart to the given path, replacing any existing file.
    fn serialize(&self, chart: &Chart, path: &Path) -> ChartResult<()>;
}

/// Codec for the osu! text format.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsuCodec;

impl ChartCodec for OsuCodec {
    fn parse(&self, path: &Path) -> ChartResult<Chart> {
        let content = fs::read_to_string(path).map_err(|e| ChartError::read(path, e))?;
        let chart = parse_chart(&content)?;

        // Difficulty files must carry the format header; storyboards do not.
        let is_chart = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(CHART_EXTENSION));
        if is_chart && chart.format_version.is_none() {
            return Err(ChartError::MissingFormatHeader);
        }

        Ok(chart)
    }

    fn serialize(&self, chart: &Chart, path: &Path) -> ChartResult<()> {
        fs::write(path, write_chart(chart)).map_err(|e| ChartError::write(path, e))
    }
}
