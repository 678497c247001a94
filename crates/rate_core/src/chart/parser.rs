//! osu! chart parser.
//!
//! Parses `.osu` difficulty files and `.osb` storyboard files.
//!
//! # Format Overview
//!
//! ```text
//! osu file format v14
//!
//! [General]
//! AudioFilename: audio.mp3
//! PreviewTime: 40000
//!
//! [Events]
//! 2,30000,35000
//! Sprite,Foreground,Centre,"sb/star.png",320,240
//!  F,0,1000,2000,0,1
//!
//! [TimingPoints]
//! 1000,333.333333333333,4,2,0,70,1,0
//!
//! [HitObjects]
//! 256,192,1500,1,0,0:0:0:0:
//! ```
//!
//! Key/value sections keep their entry order, `[Events]` lines that are
//! not breaks, storyboard objects or samples are kept verbatim, and
//! sections the parser does not know are stored raw.

use super::error::{ChartError, ChartResult};
use super::events::{
    BreakPeriod, CommandLayout, EventEntry, Events, ObjectKind, SampleSound, StoryboardCommand,
    StoryboardObject,
};
use super::hit_objects::{
    Circle, HitObject, HitObjectBase, LongNote, Slider, Spinner, UnknownHitObject, TYPE_CIRCLE,
    TYPE_LONG_NOTE, TYPE_SLIDER, TYPE_SPINNER,
};
use super::types::{Chart, RawSection, SectionName, TimingPoint};

const FORMAT_PREFIX: &str = "osu file format v";

/// Parse chart content.
///
/// # Arguments
/// * `content` - The raw file content.
///
/// # Returns
/// * `Ok(Chart)` - Parsed chart. `format_version` is `None` when the
///   content has no format header (storyboard files).
/// * `Err(ChartError)` - If a line cannot be decoded.
pub fn parse_chart(content: &str) -> ChartResult<Chart> {
    let mut chart = Chart::new();
    let mut current: Option<SectionName> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_num = idx + 1;
        let line = raw_line.trim_end().trim_start_matches('\u{feff}');
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        // Format header (only before the first section)
        if current.is_none() {
            if let Some(version) = trimmed.strip_prefix(FORMAT_PREFIX) {
                let version = version.trim().parse().map_err(|_| {
                    ChartError::parse(line_num, format!("invalid format version '{}'", version))
                })?;
                chart.format_version = Some(version);
                continue;
            }
        }

        // Section header
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            let name = SectionName::from_header(&trimmed[1..trimmed.len() - 1]);
            if let SectionName::Other(ref other) = name {
                chart.extra_sections.push(RawSection {
                    name: other.clone(),
                    lines: Vec::new(),
                });
            }
            chart.section_order.push(name.clone());
            current = Some(name);
            continue;
        }

        let Some(section) = current.as_ref() else {
            // Content before the first section is ignored.
            continue;
        };

        match section {
            SectionName::General => push_property(trimmed, &mut chart.general),
            SectionName::Editor => push_property(trimmed, &mut chart.editor),
            SectionName::Metadata => push_property(trimmed, &mut chart.metadata),
            SectionName::Difficulty => push_property(trimmed, &mut chart.difficulty),
            SectionName::Colours => push_property(trimmed, &mut chart.colours),
            SectionName::Events => parse_event_line(line, line_num, &mut chart.events)?,
            SectionName::TimingPoints => {
                if !is_comment(trimmed) {
                    chart
                        .timing_points
                        .push(parse_timing_point(trimmed, line_num)?);
                }
            }
            SectionName::HitObjects => {
                if !is_comment(trimmed) {
                    chart.hit_objects.push(parse_hit_object(trimmed, line_num)?);
                }
            }
            SectionName::Other(_) => {
                if let Some(raw) = chart.extra_sections.last_mut() {
                    raw.lines.push(line.to_string());
                }
            }
        }
    }

    Ok(chart)
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//")
}

/// Parse a `Key: Value` line into a property section.
fn push_property(line: &str, props: &mut super::types::Properties) {
    if is_comment(line) {
        return;
    }
    if let Some((key, value)) = line.split_once(':') {
        props.push(key.trim(), value.trim());
    }
}

/// Parse a time value.
///
/// Integers are expected, but some editors write decimals; those are
/// truncated the way the game reads them.
fn parse_time(value: Option<&str>, line: usize, what: &str) -> ChartResult<i32> {
    let value = value
        .map(str::trim)
        .ok_or_else(|| ChartError::parse(line, format!("missing {}", what)))?;

    if let Ok(v) = value.parse::<i32>() {
        return Ok(v);
    }

    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as i32)
        .ok_or_else(|| ChartError::parse(line, format!("invalid {} '{}'", what, value)))
}

fn parse_optional_time(value: Option<&str>, line: usize, what: &str) -> ChartResult<Option<i32>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_time(Some(v), line, what).map(Some),
    }
}

fn parse_float(value: Option<&str>, line: usize, what: &str) -> ChartResult<f64> {
    let value = value
        .map(str::trim)
        .ok_or_else(|| ChartError::parse(line, format!("missing {}", what)))?;

    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ChartError::parse(line, format!("invalid {} '{}'", what, value)))
}

fn to_strings(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Parse one `[Events]` line.
///
/// Indented lines are commands of the preceding storyboard object.
fn parse_event_line(line: &str, line_num: usize, events: &mut Events) -> ChartResult<()> {
    let depth = line
        .chars()
        .take_while(|c| *c == ' ' || *c == '_')
        .count();

    if depth > 0 {
        // Depth markers are single-byte characters.
        let (indent, body) = line.split_at(depth);
        if let Some(EventEntry::Object(object)) = events.entries.last_mut() {
            object
                .commands
                .push(parse_command(indent, body, line_num)?);
        } else {
            events.entries.push(EventEntry::Raw(line.to_string()));
        }
        return Ok(());
    }

    if is_comment(line) {
        events.entries.push(EventEntry::Raw(line.to_string()));
        return Ok(());
    }

    let fields: Vec<&str> = line.split(',').collect();
    let entry = match fields[0].trim() {
        "2" | "Break" => EventEntry::Break(BreakPeriod {
            start: parse_time(fields.get(1).copied(), line_num, "break start")?,
            end: parse_time(fields.get(2).copied(), line_num, "break end")?,
        }),
        tag @ ("Sprite" | "4") => {
            if fields.len() < 6 {
                return Err(ChartError::parse(line_num, "sprite needs 6 fields"));
            }
            EventEntry::Object(StoryboardObject {
                kind: ObjectKind::Sprite,
                tag: tag.to_string(),
                fields: to_strings(&fields[1..6]),
                frame_delay: None,
                trailing: to_strings(&fields[6..]),
                commands: Vec::new(),
            })
        }
        tag @ ("Animation" | "6") => {
            if fields.len() < 8 {
                return Err(ChartError::parse(line_num, "animation needs 8 fields"));
            }
            EventEntry::Object(StoryboardObject {
                kind: ObjectKind::Animation,
                tag: tag.to_string(),
                fields: to_strings(&fields[1..7]),
                frame_delay: Some(parse_float(Some(fields[7]), line_num, "frame delay")?),
                trailing: to_strings(&fields[8..]),
                commands: Vec::new(),
            })
        }
        tag @ ("Sample" | "5") => EventEntry::Sample(SampleSound {
            tag: tag.to_string(),
            time: parse_time(fields.get(1).copied(), line_num, "sample time")?,
            trailing: to_strings(fields.get(2..).unwrap_or_default()),
        }),
        _ => EventEntry::Raw(line.to_string()),
    };

    events.entries.push(entry);
    Ok(())
}

/// Parse a storyboard command body (without its depth markers).
fn parse_command(indent: &str, body: &str, line_num: usize) -> ChartResult<StoryboardCommand> {
    let fields: Vec<&str> = body.split(',').collect();
    let event = fields[0].trim().to_string();

    let command = match CommandLayout::for_event(&event) {
        CommandLayout::Loop => StoryboardCommand {
            indent: indent.to_string(),
            leading: Vec::new(),
            start_time: parse_time(fields.get(1).copied(), line_num, "loop start")?,
            end_time: None,
            trailing: to_strings(fields.get(2..).unwrap_or_default()),
            event,
        },
        CommandLayout::Trigger | CommandLayout::Standard => {
            if fields.len() < 3 {
                return Err(ChartError::parse(
                    line_num,
                    format!("command '{}' needs at least 3 fields", event),
                ));
            }
            StoryboardCommand {
                indent: indent.to_string(),
                leading: vec![fields[1].to_string()],
                start_time: parse_time(Some(fields[2]), line_num, "command start")?,
                end_time: parse_optional_time(fields.get(3).copied(), line_num, "command end")?,
                trailing: to_strings(fields.get(4..).unwrap_or_default()),
                event,
            }
        }
    };

    Ok(command)
}

/// Parse a `[TimingPoints]` line.
fn parse_timing_point(line: &str, line_num: usize) -> ChartResult<TimingPoint> {
    let fields: Vec<&str> = line.split(',').collect();

    Ok(TimingPoint {
        offset: parse_float(fields.first().copied(), line_num, "timing offset")?,
        beat_length: parse_float(fields.get(1).copied(), line_num, "beat length")?,
        rest: to_strings(fields.get(2..).unwrap_or_default()),
    })
}

/// Parse a `[HitObjects]` line into its variant.
fn parse_hit_object(line: &str, line_num: usize) -> ChartResult<HitObject> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 5 {
        return Err(ChartError::parse(line_num, "hit object needs at least 5 fields"));
    }

    let type_bits: u32 = fields[3].trim().parse().map_err(|_| {
        ChartError::parse(line_num, format!("invalid hit object type '{}'", fields[3]))
    })?;

    let base = HitObjectBase {
        x: parse_time(Some(fields[0]), line_num, "x position")?,
        y: parse_time(Some(fields[1]), line_num, "y position")?,
        time: parse_time(Some(fields[2]), line_num, "hit object time")?,
        type_bits,
        hit_sound: fields[4].to_string(),
    };
    let extras = to_strings(&fields[5..]);

    let object = if type_bits & TYPE_CIRCLE != 0 {
        HitObject::Circle(Circle { base, extras })
    } else if type_bits & TYPE_SLIDER != 0 {
        HitObject::Slider(Slider {
            base,
            params: extras,
        })
    } else if type_bits & TYPE_SPINNER != 0 {
        HitObject::Spinner(Spinner {
            end_time: parse_time(fields.get(5).copied(), line_num, "spinner end")?,
            extras: to_strings(fields.get(6..).unwrap_or_default()),
            base,
        })
    } else if type_bits & TYPE_LONG_NOTE != 0 {
        let rest = fields[5..].join(",");
        let (end, sample) = match rest.split_once(':') {
            Some((end, sample)) => (end.to_string(), Some(sample.to_string())),
            None => (rest, None),
        };
        HitObject::LongNote(LongNote {
            end_time: parse_time(Some(&end), line_num, "hold end")?,
            sample,
            base,
        })
    } else {
        HitObject::Unknown(UnknownHitObject { base, extras })
    };

    Ok(object)
}
