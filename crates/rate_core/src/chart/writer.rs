//! osu! chart writer.
//!
//! Output is deterministic: sections are written in the order they were
//! parsed, separated by a blank line, with `\n` line endings.

use super::events::{CommandLayout, EventEntry, Events, StoryboardCommand, StoryboardObject};
use super::hit_objects::{HitObject, HitObjectBase};
use super::types::{Chart, Properties, SectionName, TimingPoint};

/// Serialize a chart to a string.
pub fn write_chart(chart: &Chart) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(version) = chart.format_version {
        blocks.push(format!("osu file format v{}\n", version));
    }

    let mut extra = chart.extra_sections.iter();

    for section in &chart.section_order {
        let mut out = format!("[{}]\n", section.header());
        match section {
            SectionName::General => write_properties(&mut out, &chart.general),
            SectionName::Editor => write_properties(&mut out, &chart.editor),
            SectionName::Metadata => write_properties(&mut out, &chart.metadata),
            SectionName::Difficulty => write_properties(&mut out, &chart.difficulty),
            SectionName::Colours => write_properties(&mut out, &chart.colours),
            SectionName::Events => write_events(&mut out, &chart.events),
            SectionName::TimingPoints => {
                for point in &chart.timing_points {
                    push_line(&mut out, &format_timing_point(point));
                }
            }
            SectionName::HitObjects => {
                for object in &chart.hit_objects {
                    push_line(&mut out, &format_hit_object(object));
                }
            }
            SectionName::Other(_) => {
                if let Some(raw) = extra.next() {
                    for line in &raw.lines {
                        push_line(&mut out, line);
                    }
                }
            }
        }
        blocks.push(out);
    }

    blocks.join("\n")
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn write_properties(out: &mut String, props: &Properties) {
    let separator = props.separator.as_str();
    for entry in &props.entries {
        push_line(out, &format!("{}{}{}", entry.key, separator, entry.value));
    }
}

/// Format a float the shortest way that reads back to the same value.
///
/// Whole numbers are written without a fractional part (`500`, not `500.0`).
pub fn format_float(value: f64) -> String {
    format!("{}", value)
}

fn join_fields(head: &[String], tail: &[String]) -> String {
    head.iter()
        .chain(tail.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn write_events(out: &mut String, events: &Events) {
    for entry in &events.entries {
        match entry {
            EventEntry::Break(b) => push_line(out, &format!("2,{},{}", b.start, b.end)),
            EventEntry::Object(object) => write_object(out, object),
            EventEntry::Sample(sample) => {
                let head = vec![sample.tag.clone(), sample.time.to_string()];
                push_line(out, &join_fields(&head, &sample.trailing));
            }
            EventEntry::Raw(line) => push_line(out, line),
        }
    }
}

fn write_object(out: &mut String, object: &StoryboardObject) {
    let mut head = vec![object.tag.clone()];
    head.extend(object.fields.iter().cloned());
    if let Some(delay) = object.frame_delay {
        head.push(format_float(delay));
    }
    push_line(out, &join_fields(&head, &object.trailing));

    for command in &object.commands {
        push_line(out, &format_command(command));
    }
}

fn format_command(command: &StoryboardCommand) -> String {
    let mut head = vec![command.event.clone()];
    head.extend(command.leading.iter().cloned());
    head.push(command.start_time.to_string());

    match command.layout() {
        CommandLayout::Loop => {}
        CommandLayout::Trigger => {
            // End and group number are optional for triggers.
            if command.end_time.is_some() || !command.trailing.is_empty() {
                head.push(command.end_time.map(|t| t.to_string()).unwrap_or_default());
            }
        }
        CommandLayout::Standard => {
            head.push(command.end_time.map(|t| t.to_string()).unwrap_or_default());
        }
    }

    format!("{}{}", command.indent, join_fields(&head, &command.trailing))
}

fn format_timing_point(point: &TimingPoint) -> String {
    let head = vec![format_float(point.offset), format_float(point.beat_length)];
    join_fields(&head, &point.rest)
}

fn format_base(base: &HitObjectBase) -> Vec<String> {
    vec![
        base.x.to_string(),
        base.y.to_string(),
        base.time.to_string(),
        base.type_bits.to_string(),
        base.hit_sound.clone(),
    ]
}

fn format_hit_object(object: &HitObject) -> String {
    match object {
        HitObject::Circle(c) => join_fields(&format_base(&c.base), &c.extras),
        HitObject::Slider(s) => join_fields(&format_base(&s.base), &s.params),
        HitObject::Spinner(s) => {
            let mut head = format_base(&s.base);
            head.push(s.end_time.to_string());
            join_fields(&head, &s.extras)
        }
        HitObject::LongNote(n) => {
            let mut head = format_base(&n.base);
            match &n.sample {
                Some(sample) => head.push(format!("{}:{}", n.end_time, sample)),
                None => head.push(n.end_time.to_string()),
            }
            head.join(",")
        }
        HitObject::Unknown(u) => join_fields(&format_base(&u.base), &u.extras),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::parser::parse_chart;

    const CHART: &str = "osu file format v14

[General]
AudioFilename: audio.mp3
PreviewTime: 40000

[Metadata]
Title:Song
Version:Hard

[Events]
//Storyboard Layer 0 (Background)
2,30000,35000
Sprite,Foreground,Centre,\"star.png\",320,240
 F,0,1000,,0,1
 L,5000,4
  M,0,0,500,320,240,330,250
 T,HitSound,100
Animation,Background,Centre,\"anim.png\",0,0,8,33.5,LoopOnce
Sample,7000,0,\"clap.wav\",80

[TimingPoints]
1000,333.333333333333,4,2,0,70,1,0
2000,-50,4,2,0,70,0,0

[Colours]
Combo1 : 255,128,0

[HitObjects]
256,192,1500,1,0,0:0:0:0:
100,100,2000,2,0,B|200:100,1,100
256,192,3000,12,0,4000,0:0:0:0:
64,192,5000,128,0,5500:0:0:0:0:
";

    #[test]
    fn rewrites_parsed_chart_verbatim() {
        let chart = parse_chart(CHART).unwrap();
        assert_eq!(write_chart(&chart), CHART);
    }

    #[test]
    fn writes_raw_sections_in_place() {
        let content = "[Variables]\n$a=1\n\n[Events]\nSample,100,0,\"a.wav\",50\n";
        let chart = parse_chart(content).unwrap();

        assert_eq!(write_chart(&chart), content);
    }

    #[test]
    fn format_float_drops_trailing_zero() {
        assert_eq!(format_float(500.0), "500");
        assert_eq!(format_float(222.5), "222.5");
        assert_eq!(format_float(-100.0), "-100");
    }
}
