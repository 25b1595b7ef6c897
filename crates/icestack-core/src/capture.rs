//! Capture timestamps from the radar feed.
//!
//! Feed timestamps carry a fixed Alaska UTC offset (`-08:00` or `-09:00`).
//! The offset is stripped rather than converted: every record in a feed uses
//! the same known offset, so naive comparisons between records stay
//! consistent and no timezone machinery is needed.

use std::ops::{Add, Sub};

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while parsing a raw feed timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The raw string does not end in the expected `-08:00`/`-09:00` marker.
    MissingOffset(String),
    /// The remainder before the marker is not `YYYY-MM-DDTHH:MM:SS`.
    InvalidFormat(String),
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingOffset(raw) => {
                write!(f, "timestamp has no trailing -08:00/-09:00 offset: {:?}", raw)
            }
            Self::InvalidFormat(raw) => {
                write!(f, "timestamp is not YYYY-MM-DDTHH:MM:SS: {:?}", raw)
            }
        }
    }
}

impl std::error::Error for TimestampError {}

// ── CaptureTime ────────────────────────────────────────────────────────────

const EVENT_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The point in time a capture claims to represent.
///
/// Timezone-naive, second precision. Derived once per record; parsing the
/// same raw string twice yields an identical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CaptureTime(NaiveDateTime);

impl CaptureTime {
    /// Parse a feed `event_at` string, e.g. `"2016-01-30T21:17:04-09:00"`.
    pub fn parse_event_at(raw: &str) -> Result<Self, TimestampError> {
        let head = strip_offset(raw)
            .ok_or_else(|| TimestampError::MissingOffset(raw.to_string()))?;
        let naive = NaiveDateTime::parse_from_str(head, EVENT_AT_FORMAT)
            .map_err(|_| TimestampError::InvalidFormat(raw.to_string()))?;
        Ok(Self(naive))
    }

    pub fn from_naive(naive: NaiveDateTime) -> Self {
        Self(naive)
    }

    /// Human-readable form used on rendered artifacts: `YYYY-MM-DD HH:MM:SS`.
    pub fn display_stamp(&self) -> String {
        self.0.format(DISPLAY_FORMAT).to_string()
    }
}

impl std::fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_stamp())
    }
}

impl Sub<Duration> for CaptureTime {
    type Output = CaptureTime;

    fn sub(self, rhs: Duration) -> CaptureTime {
        CaptureTime(self.0 - rhs)
    }
}

impl Add<Duration> for CaptureTime {
    type Output = CaptureTime;

    fn add(self, rhs: Duration) -> CaptureTime {
        CaptureTime(self.0 + rhs)
    }
}

impl Sub for CaptureTime {
    type Output = Duration;

    fn sub(self, rhs: CaptureTime) -> Duration {
        self.0 - rhs.0
    }
}

/// Strip the fixed-offset marker `-0[8-9]:00` from the end of a raw string.
fn strip_offset(raw: &str) -> Option<&str> {
    raw.strip_suffix("-08:00")
        .or_else(|| raw.strip_suffix("-09:00"))
}
