//! icestack-core — assembles recent sea-ice radar captures into a fixed,
//! evenly spaced sequence of annotated map layers.
//!
//! One batch run walks these stages:
//!
//! 1. **Feed** – fetch the radar capture feed (newest record first).
//! 2. **Capture** – strip the fixed UTC offset, parse capture timestamps.
//! 3. **Timeline** – single forward pass assigning captures to output slots
//!    under a tolerance window, with placeholder fallback.
//! 4. **Warp** – reproject matched captures from the radar's local
//!    azimuthal-equidistant grid to web-mercator.
//! 5. **Annotate** – stamp the capture timestamp, or render a "no data"
//!    placeholder for slots the scan passed without a match.

pub mod annotate;
pub mod capture;
pub mod feed;
pub mod job;
pub mod render;
pub mod timeline;
pub mod warp;

pub use capture::CaptureTime;
pub use feed::FeedEntry;
pub use job::{JobConfig, JobError};
pub use render::{RenderConfig, SlotRenderer};
pub use timeline::{ScanReport, SequenceParams, SlotOutcome, Termination};
