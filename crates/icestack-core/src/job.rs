//! One batch run: fetch the feed, scan it, render the layer sequence.

use crate::capture::CaptureTime;
use crate::feed::{self, FeedError};
use crate::render::{RadarRenderer, RenderConfig, RenderError};
use crate::timeline::{self, ScanError, ScanReport, SequenceParams};

#[derive(Debug, Clone)]
pub struct JobConfig {
    pub feed_url: String,
    pub params: SequenceParams,
    pub render: RenderConfig,
}

#[derive(Debug)]
pub enum JobError {
    Feed(FeedError),
    Render(RenderError),
    Scan(ScanError),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feed(e) => write!(f, "{}", e),
            Self::Render(e) => write!(f, "{}", e),
            Self::Scan(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Feed(e) => Some(e),
            Self::Render(e) => Some(e),
            Self::Scan(e) => Some(e),
        }
    }
}

impl From<FeedError> for JobError {
    fn from(e: FeedError) -> Self {
        Self::Feed(e)
    }
}

impl From<RenderError> for JobError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

impl From<ScanError> for JobError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

/// Run the whole job once. `now` is the freshness reference, local naive
/// wall-clock in production.
pub fn run(config: &JobConfig, now: CaptureTime) -> Result<ScanReport, JobError> {
    let records = feed::fetch_records(&config.feed_url)?;
    tracing::info!("Feed returned {} records.", records.len());

    let mut renderer = RadarRenderer::new(config.render.clone())?;
    let report = timeline::run_scan(&records, &config.params, now, &mut renderer)?;
    Ok(report)
}
