//! Hit object variants.
//!
//! The type field of a hit object line is a bitfield; the low bits select
//! the concrete kind:
//!
//! ```text
//! 1   circle
//! 2   slider
//! 8   spinner
//! 128 hold note (mania)
//! ```
//!
//! Anything else decodes to [`HitObject::Unknown`], which the rate
//! transform refuses to rescale.

pub const TYPE_CIRCLE: u32 = 1;
pub const TYPE_SLIDER: u32 = 1 << 1;
pub const TYPE_SPINNER: u32 = 1 << 3;
pub const TYPE_LONG_NOTE: u32 = 1 << 7;

/// Capability shared by every hit object: when it is rendered, and when
/// it ends if it has a duration.
pub trait Timed {
    fn time(&self) -> i32;
    fn end_time(&self) -> Option<i32>;
}

/// Fields common to all hit objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitObjectBase {
    pub x: i32,
    pub y: i32,
    pub time: i32,
    pub type_bits: u32,
    pub hit_sound: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circle {
    pub base: HitObjectBase,
    /// Hit sample and any trailing fields.
    pub extras: Vec<String>,
}

/// A slider. Its duration derives from length and the active timing
/// point, so only the start time is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slider {
    pub base: HitObjectBase,
    /// Curve, slides, length, edge sounds, edge sets, hit sample.
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spinner {
    pub base: HitObjectBase,
    pub end_time: i32,
    pub extras: Vec<String>,
}

/// A mania hold note: `x,y,time,type,hitSound,endTime:hitSample`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongNote {
    pub base: HitObjectBase,
    pub end_time: i32,
    pub sample: Option<String>,
}

/// A hit object whose type bits match no known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownHitObject {
    pub base: HitObjectBase,
    pub extras: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitObject {
    Circle(Circle),
    Slider(Slider),
    Spinner(Spinner),
    LongNote(LongNote),
    Unknown(UnknownHitObject),
}

impl HitObject {
    pub fn base(&self) -> &HitObjectBase {
        match self {
            HitObject::Circle(c) => &c.base,
            HitObject::Slider(s) => &s.base,
            HitObject::Spinner(s) => &s.base,
            HitObject::LongNote(n) => &n.base,
            HitObject::Unknown(u) => &u.base,
        }
    }

    /// Short kind name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            HitObject::Circle(_) => "circle",
            HitObject::Slider(_) => "slider",
            HitObject::Spinner(_) => "spinner",
            HitObject::LongNote(_) => "long note",
            HitObject::Unknown(_) => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, HitObject::Unknown(_))
    }
}

impl Timed for HitObject {
    fn time(&self) -> i32 {
        self.base().time
    }

    fn end_time(&self) -> Option<i32> {
        match self {
            HitObject::Spinner(s) => Some(s.end_time),
            HitObject::LongNote(n) => Some(n.end_time),
            _ => None,
        }
    }
}

/// Which variant a type bitfield selects, or `None` for unknown.
pub fn kind_for_type_bits(type_bits: u32) -> Option<&'static str> {
    if type_bits & TYPE_CIRCLE != 0 {
        Some("circle")
    } else if type_bits & TYPE_SLIDER != 0 {
        Some("slider")
    } else if type_bits & TYPE_SPINNER != 0 {
        Some("spinner")
    } else if type_bits & TYPE_LONG_NOTE != 0 {
        Some("long note")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(time: i32, type_bits: u32) -> HitObjectBase {
        HitObjectBase {
            x: 256,
            y: 192,
            time,
            type_bits,
            hit_sound: "0".to_string(),
        }
    }

    #[test]
    fn type_bits_select_kind() {
        // New-combo (4) and combo-skip bits must not change the kind.
        assert_eq!(kind_for_type_bits(1 | 4), Some("circle"));
        assert_eq!(kind_for_type_bits(2 | 4 | 16), Some("slider"));
        assert_eq!(kind_for_type_bits(8 | 4), Some("spinner"));
        assert_eq!(kind_for_type_bits(128), Some("long note"));
        assert_eq!(kind_for_type_bits(64), None);
    }

    #[test]
    fn timed_capability_reports_end_time() {
        let spinner = HitObject::Spinner(Spinner {
            base: base(1000, TYPE_SPINNER),
            end_time: 3000,
            extras: Vec::new(),
        });
        let circle = HitObject::Circle(Circle {
            base: base(500, TYPE_CIRCLE),
            extras: Vec::new(),
        });

        assert_eq!(spinner.time(), 1000);
        assert_eq!(spinner.end_time(), Some(3000));
        assert_eq!(circle.end_time(), None);
        assert_eq!(circle.kind_name(), "circle");
    }
}
