use std::fmt;
use std::ops::Add;
use thiserror::Error;

use crate::ffprobe::{FFProbeData, FFProbeStream};

const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;

/// A stream duration in whole microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(u64);

impl MediaDuration {
    pub fn from_micros(micros: u64) -> Self {
        MediaDuration(micros)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn hours(&self) -> u64 {
        self.0 / MICROS_PER_HOUR
    }

    pub fn minutes(&self) -> u64 {
        (self.0 % MICROS_PER_HOUR) / MICROS_PER_MINUTE
    }

    pub fn seconds(&self) -> u64 {
        (self.0 % MICROS_PER_MINUTE) / MICROS_PER_SECOND
    }

    pub fn subsec_micros(&self) -> u64 {
        self.0 % MICROS_PER_SECOND
    }

    /// Parse ffprobe's sexagesimal `H:MM:SS.ffffff`
    pub fn parse_sexagesimal(raw: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::MalformedDuration(raw.to_string());
        let trimmed = raw.trim();

        let mut parts = trimmed.splitn(3, ':');
        let (hours, minutes, rest) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(m), Some(rest)) => (h, m, rest),
            _ => return Err(malformed()),
        };
        let (seconds, fraction) = rest.split_once('.').ok_or_else(malformed)?;

        let hours = parse_digits(hours).ok_or_else(malformed)?;
        let minutes = parse_digits(minutes).ok_or_else(malformed)?;
        let seconds = parse_digits(seconds).ok_or_else(malformed)?;
        if minutes >= 60 || seconds >= 60 || fraction.len() > 6 {
            return Err(malformed());
        }
        // "5" after the point means 500000
        let micros = parse_digits(fraction).ok_or_else(malformed)? * 10u64.pow(6 - fraction.len() as u32);

        hours
            .checked_mul(MICROS_PER_HOUR)
            .and_then(|total| total.checked_add(minutes * MICROS_PER_MINUTE))
            .and_then(|total| total.checked_add(seconds * MICROS_PER_SECOND))
            .and_then(|total| total.checked_add(micros))
            .map(MediaDuration)
            .ok_or_else(malformed)
    }

    /// `HHh:MMm:SSs`, used for the total-duration report
    pub fn summary_string(&self) -> String {
        format!("{:02}h:{:02}m:{:02}s", self.hours(), self.minutes(), self.seconds())
    }
}

/// Unsigned, ASCII digits only; rejects signs and empty components
fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for MediaDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:06}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.subsec_micros()
        )
    }
}

impl Add for MediaDuration {
    type Output = MediaDuration;

    fn add(self, rhs: MediaDuration) -> MediaDuration {
        MediaDuration(self.0.saturating_add(rhs.0))
    }
}

/// Normalized facts about one media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaFacts {
    duration: Option<MediaDuration>,
    width: Option<u32>,
    height: Option<u32>,
    rotation: Option<i32>,
}

impl MediaFacts {
    pub fn new(
        duration: Option<MediaDuration>,
        width: Option<u32>,
        height: Option<u32>,
        rotation: Option<i32>,
    ) -> Self {
        Self { duration, width, height, rotation }
    }

    /// Facts for a still image: dimensions only
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(None, Some(width), Some(height), None)
    }

    pub fn duration(&self) -> Option<MediaDuration> {
        self.duration
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn rotation(&self) -> Option<i32> {
        self.rotation
    }
}

/// Coarse parse failure kind, used in skip reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    MalformedDuration,
    InvalidDimensions,
    MissingStream,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseErrorKind::MalformedDuration => "MalformedDuration",
            ParseErrorKind::InvalidDimensions => "InvalidDimensions",
            ParseErrorKind::MissingStream => "MissingStream",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed duration: {0:?}")]
    MalformedDuration(String),
    #[error("invalid dimensions: width={width:?} height={height:?}")]
    InvalidDimensions { width: Option<i64>, height: Option<i64> },
    #[error("no video or audio stream")]
    MissingStream,
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::MalformedDuration(_) => ParseErrorKind::MalformedDuration,
            ParseError::InvalidDimensions { .. } => ParseErrorKind::InvalidDimensions,
            ParseError::MissingStream => ParseErrorKind::MissingStream,
        }
    }
}

/// Normalize a probe record into [`MediaFacts`]
///
/// Duration comes from the first video stream, or the first audio stream when
/// there is no video. Dimensions come from the first video stream only, and
/// rotation from the first stream's side data.
pub fn parse(data: &FFProbeData) -> Result<MediaFacts, ParseError> {
    let video = data.streams.iter().find(|s| s.is_video());
    let audio = data.streams.iter().find(|s| s.is_audio());

    let duration_stream = match video.or(audio) {
        Some(stream) => stream,
        None => return Err(ParseError::MissingStream),
    };

    let duration = match duration_stream.duration.as_deref().map(str::trim) {
        None | Some("N/A") => None,
        Some(raw) => Some(MediaDuration::parse_sexagesimal(raw)?),
    };

    let (width, height) = match video {
        Some(stream) => dimensions(stream)?,
        None => (None, None),
    };

    let rotation = data.streams.first().and_then(rotation);

    Ok(MediaFacts::new(duration, width, height, rotation))
}

fn dimensions(stream: &FFProbeStream) -> Result<(Option<u32>, Option<u32>), ParseError> {
    let invalid = || ParseError::InvalidDimensions {
        width: stream.width,
        height: stream.height,
    };
    match (stream.width, stream.height) {
        (None, None) => Ok((None, None)),
        (Some(w), Some(h)) if w > 0 && h > 0 => {
            let w = u32::try_from(w).map_err(|_| invalid())?;
            let h = u32::try_from(h).map_err(|_| invalid())?;
            Ok((Some(w), Some(h)))
        }
        _ => Err(invalid()),
    }
}

fn rotation(stream: &FFProbeStream) -> Option<i32> {
    let from_side_data = stream
        .side_data_list
        .iter()
        .flatten()
        .find_map(|side| side.rotation);
    let from_tags = || {
        stream
            .tags
            .as_ref()
            .and_then(|tags| tags.get("rotate"))
            .and_then(|r| r.trim().parse::<i64>().ok())
    };
    from_side_data
        .or_else(from_tags)
        .and_then(|r| i32::try_from(r).ok())
}
