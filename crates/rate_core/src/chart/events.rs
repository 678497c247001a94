//! `[Events]` section types: breaks, storyboard objects and sample sounds.

/// A break period between two sections of play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPeriod {
    pub start: i32,
    pub end: i32,
}

/// Storyboard object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Sprite,
    Animation,
}

/// A storyboard sprite or animation with its attached command list.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryboardObject {
    pub kind: ObjectKind,
    /// Leading token as written (`Sprite`, `4`, `Animation`, `6`).
    pub tag: String,
    /// Layer, origin, file path, x, y (and frame count for animations).
    pub fields: Vec<String>,
    /// Milliseconds between animation frames.
    pub frame_delay: Option<f64>,
    /// Fields after the frame delay (loop type).
    pub trailing: Vec<String>,
    pub commands: Vec<StoryboardCommand>,
}

/// Field layout of a storyboard command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLayout {
    /// `E,easing,start,end,params...`
    Standard,
    /// `L,start,loopcount`
    Loop,
    /// `T,trigger,start,end,group`
    Trigger,
}

impl CommandLayout {
    /// Layout for a command event token.
    pub fn for_event(event: &str) -> Self {
        match event {
            "L" => CommandLayout::Loop,
            "T" => CommandLayout::Trigger,
            _ => CommandLayout::Standard,
        }
    }
}

/// One storyboard command (an action in the object's action list).
///
/// Commands nested in a loop or trigger carry times relative to the
/// enclosing command; they scale with the same rule as absolute times.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryboardCommand {
    /// Leading depth markers exactly as written (spaces or underscores).
    pub indent: String,
    pub event: String,
    /// Fields between the event and the start time (easing, trigger name).
    pub leading: Vec<String>,
    pub start_time: i32,
    pub end_time: Option<i32>,
    /// Fields after the timing (parameters, loop count, group number).
    pub trailing: Vec<String>,
}

impl StoryboardCommand {
    pub fn layout(&self) -> CommandLayout {
        CommandLayout::for_event(&self.event)
    }

    /// Nesting depth (1 for top-level commands).
    pub fn depth(&self) -> usize {
        self.indent.chars().count()
    }
}

/// A storyboard sample trigger (`Sample,time,layer,"file",volume`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSound {
    /// Leading token as written (`Sample` or `5`).
    pub tag: String,
    pub time: i32,
    /// Layer, file path, volume.
    pub trailing: Vec<String>,
}

/// One line group of the `[Events]` section.
#[derive(Debug, Clone, PartialEq)]
pub enum EventEntry {
    Break(BreakPeriod),
    Object(StoryboardObject),
    Sample(SampleSound),
    /// Comments, backgrounds, videos and anything else kept verbatim.
    Raw(String),
}

/// The `[Events]` section, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Events {
    pub entries: Vec<EventEntry>,
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn breaks(&self) -> impl Iterator<Item = &BreakPeriod> {
        self.entries.iter().filter_map(|e| match e {
            EventEntry::Break(b) => Some(b),
            _ => None,
        })
    }

    pub fn objects(&self) -> impl Iterator<Item = &StoryboardObject> {
        self.entries.iter().filter_map(|e| match e {
            EventEntry::Object(o) => Some(o),
            _ => None,
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = &SampleSound> {
        self.entries.iter().filter_map(|e| match e {
            EventEntry::Sample(s) => Some(s),
            _ => None,
        })
    }
}
