//! Pure rescaling of chart time values.
//!
//! A time or duration `t` becomes `t / rate`. Integer fields truncate
//! toward zero, the way the game stores them; float fields (timing offsets,
//! beat lengths, frame delays) keep full precision.
//!
//! Inherited timing points store a negative beat length that is a slider
//! velocity multiplier, not a duration, so it passes through unchanged.

use crate::chart::{
    Chart, EventEntry, Events, HitObject, SampleSound, StoryboardCommand, StoryboardObject,
    TimingPoint, UNASSIGNED_BEATMAP_ID,
};

use super::error::{TransformError, TransformResult};
use super::naming::{chart_file_name, converted_version, suffixed_file_name, RateTag};

/// Rescale an integer millisecond value.
pub fn scale_time(time: i32, rate: f64) -> i32 {
    (f64::from(time) / rate) as i32
}

/// Rescale a float millisecond value.
pub fn scale_duration(value: f64, rate: f64) -> f64 {
    value / rate
}

/// File name the converted copy of `chart` is saved under.
pub fn converted_chart_name(chart: &Chart, tag: &RateTag) -> String {
    chart_file_name(
        chart.artist(),
        chart.title(),
        chart.creator(),
        chart.version(),
        tag,
    )
}

/// Produce a rescaled copy of a chart.
///
/// Besides times, the copy gets a rate-suffixed difficulty name, points at
/// the rate-suffixed audio file, and has its online ID reset so it cannot
/// be mistaken for the original.
///
/// # Errors
/// [`TransformError::UnsupportedHitObject`] if any hit object is of an
/// unknown kind. The input chart is never modified.
pub fn rescale_chart(chart: &Chart, tag: &RateTag) -> TransformResult<Chart> {
    let rate = tag.rate();

    let hit_objects = chart
        .hit_objects
        .iter()
        .enumerate()
        .map(|(index, object)| rescale_hit_object(index, object, rate))
        .collect::<TransformResult<Vec<_>>>()?;

    let mut converted = chart.clone();
    converted.hit_objects = hit_objects;

    // General
    if let Some(audio) = chart.audio_filename() {
        converted.set_audio_filename(suffixed_file_name(audio, tag));
    }
    if let Some(preview) = chart.preview_time() {
        // -1 means "no preview point"
        if preview >= 0 {
            converted.set_preview_time(scale_time(preview, rate));
        }
    }

    // Editor
    if chart.has_bookmarks() {
        let bookmarks: Vec<i32> = chart
            .bookmarks()
            .into_iter()
            .map(|b| scale_time(b, rate))
            .collect();
        converted.set_bookmarks(&bookmarks);
    }

    // Metadata
    converted.set_version(converted_version(chart.version(), tag));
    converted.set_beatmap_id(UNASSIGNED_BEATMAP_ID);

    converted.events = rescale_events(&chart.events, rate);
    converted.timing_points = chart
        .timing_points
        .iter()
        .map(|point| rescale_timing_point(point, rate))
        .collect();

    Ok(converted)
}

/// Produce a rescaled copy of a standalone storyboard (`.osb`).
///
/// Storyboards carry no hit objects or timing; only events change.
pub fn rescale_storyboard(storyboard: &Chart, rate: f64) -> Chart {
    Chart {
        events: rescale_events(&storyboard.events, rate),
        ..storyboard.clone()
    }
}

/// Rescale an `[Events]` section element-wise.
///
/// Entry count and order are preserved; raw lines are copied as-is.
pub fn rescale_events(events: &Events, rate: f64) -> Events {
    let entries = events
        .entries
        .iter()
        .map(|entry| match entry {
            EventEntry::Break(b) => {
                let mut scaled = *b;
                scaled.start = scale_time(b.start, rate);
                scaled.end = scale_time(b.end, rate);
                EventEntry::Break(scaled)
            }
            EventEntry::Object(object) => EventEntry::Object(rescale_object(object, rate)),
            EventEntry::Sample(sample) => EventEntry::Sample(SampleSound {
                time: scale_time(sample.time, rate),
                ..sample.clone()
            }),
            EventEntry::Raw(line) => EventEntry::Raw(line.clone()),
        })
        .collect();

    Events { entries }
}

fn rescale_object(object: &StoryboardObject, rate: f64) -> StoryboardObject {
    StoryboardObject {
        frame_delay: object.frame_delay.map(|d| scale_duration(d, rate)),
        commands: object
            .commands
            .iter()
            .map(|command| rescale_command(command, rate))
            .collect(),
        ..object.clone()
    }
}

fn rescale_command(command: &StoryboardCommand, rate: f64) -> StoryboardCommand {
    StoryboardCommand {
        start_time: scale_time(command.start_time, rate),
        end_time: command.end_time.map(|t| scale_time(t, rate)),
        ..command.clone()
    }
}

/// Rescale a timing point.
pub fn rescale_timing_point(point: &TimingPoint, rate: f64) -> TimingPoint {
    TimingPoint {
        offset: scale_duration(point.offset, rate),
        beat_length: if point.beat_length > 0.0 {
            scale_duration(point.beat_length, rate)
        } else {
            point.beat_length
        },
        rest: point.rest.clone(),
    }
}

/// Rescale one hit object, keeping its variant.
pub fn rescale_hit_object(index: usize, object: &HitObject, rate: f64) -> TransformResult<HitObject> {
    let mut scaled = object.clone();

    match &mut scaled {
        HitObject::Circle(c) => c.base.time = scale_time(c.base.time, rate),
        HitObject::Slider(s) => s.base.time = scale_time(s.base.time, rate),
        HitObject::Spinner(s) => {
            s.base.time = scale_time(s.base.time, rate);
            s.end_time = scale_time(s.end_time, rate);
        }
        HitObject::LongNote(n) => {
            n.base.time = scale_time(n.base.time, rate);
            n.end_time = scale_time(n.end_time, rate);
        }
        HitObject::Unknown(u) => {
            return Err(TransformError::UnsupportedHitObject {
                index,
                type_bits: u.base.type_bits,
                time: u.base.time,
            });
        }
    }

    Ok(scaled)
}
