use crate::metadata::MediaFacts;

/// Videos shorter than one second are left out of orientation sorting
pub const MIN_DURATION_MICROS: u64 = 1_000_000;

/// 9:16, the only ratio treated as portrait
const PORTRAIT_RATIO: f64 = 0.5625;

/// Orientation of a visual stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    Unknown,
}

/// Whether a file is long enough to be sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationVerdict {
    Valid,
    TooShort,
}

/// `width / height`, or `None` for a zero height
pub fn aspect_ratio(width: u32, height: u32) -> Option<f64> {
    if height == 0 {
        return None;
    }
    Some(f64::from(width) / f64::from(height))
}

/// Derive the orientation from stream dimensions
///
/// With `apply_rotation`, a stream rotated by 90 or 270 degrees has its width
/// and height swapped first, so a rotated 1920x1080 phone recording reads as
/// 1080x1920. The ratio is rounded to 4 decimals before comparing with 9:16.
pub fn orientation(facts: &MediaFacts, apply_rotation: bool) -> Orientation {
    let (mut width, mut height) = match (facts.width(), facts.height()) {
        (Some(w), Some(h)) => (w, h),
        _ => return Orientation::Unknown,
    };

    if apply_rotation && is_quarter_turn(facts.rotation()) {
        std::mem::swap(&mut width, &mut height);
    }

    match aspect_ratio(width, height) {
        Some(ratio) if round4(ratio) == PORTRAIT_RATIO => Orientation::Portrait,
        Some(_) => Orientation::Landscape,
        None => Orientation::Unknown,
    }
}

/// `TooShort` only when a duration is known and below the threshold
pub fn duration_verdict(facts: &MediaFacts, threshold_micros: u64) -> DurationVerdict {
    match facts.duration() {
        Some(d) if d.as_micros() < threshold_micros => DurationVerdict::TooShort,
        _ => DurationVerdict::Valid,
    }
}

fn is_quarter_turn(rotation: Option<i32>) -> bool {
    matches!(rotation.map(|r| r.rem_euclid(360)), Some(90) | Some(270))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
