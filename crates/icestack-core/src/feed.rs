//! Sea-ice radar capture feed.
//!
//! The feed is a JSON array of capture references, newest first. The existing
//! order is trusted to be non-increasing in time; duplicates and minor
//! disorder are tolerated downstream by the slot matcher.

use serde::Deserialize;

use crate::capture::{CaptureTime, TimestampError};

/// GINA's Utqiaġvik (Barrow) sea-ice radar GeoTIFF feed.
pub const DEFAULT_FEED_URL: &str =
    "http://feeder.gina.alaska.edu/radar-uaf-barrow-seaice-geotif.json";

/// One capture reference from the feed. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedEntry {
    /// Raw capture timestamp with a fixed UTC offset suffix.
    pub event_at: String,
    /// Fetchable URL of the capture image.
    pub source: String,
}

impl FeedEntry {
    /// Parse this record's capture time.
    pub fn capture_time(&self) -> Result<CaptureTime, TimestampError> {
        CaptureTime::parse_event_at(&self.event_at)
    }
}

/// Errors raised while obtaining the record list.
#[derive(Debug)]
pub enum FeedError {
    /// The transport call failed (connect, status, or body read).
    Unavailable(String),
    /// The payload does not parse into the expected record shape.
    Malformed(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "feed unavailable: {}", msg),
            Self::Malformed(msg) => write!(f, "feed malformed: {}", msg),
        }
    }
}

impl std::error::Error for FeedError {}

/// Parse a feed payload into its ordered record list.
///
/// An empty array is rejected: the run anchors every slot on the newest
/// record, so a feed with no records has no usable shape.
pub fn parse_feed(payload: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let entries: Vec<FeedEntry> =
        serde_json::from_str(payload).map_err(|e| FeedError::Malformed(e.to_string()))?;
    if entries.is_empty() {
        return Err(FeedError::Malformed("feed contains no records".to_string()));
    }
    Ok(entries)
}

/// Fetch and parse the feed. One call, no retries; any failure aborts the run.
pub fn fetch_records(url: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let body = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(|e| FeedError::Unavailable(format!("GET {}: {}", url, e)))?;
    parse_feed(&body)
}
