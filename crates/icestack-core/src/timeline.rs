//! Slot assignment over the capture feed.
//!
//! The scan walks the time-ordered record list once, newest first, and
//! assigns at most one record to each of a fixed number of evenly spaced
//! output slots. Slot `p` expects a capture at `first_date − layer_interval
//! × (p − 1)`, where `first_date` is the newest record's capture time. A
//! record inside the slot's tolerance window fills it; once the scan has
//! passed the window without a match the slot is filled with a placeholder
//! instead. Slots are never revisited: the feed order is non-increasing in
//! time, so every record after the window only moves further from it.

use std::collections::HashMap;

use chrono::Duration;
use serde::Serialize;

use crate::capture::{CaptureTime, TimestampError};
use crate::feed::FeedEntry;
use crate::render::{RenderError, SlotRenderer};

// ── Parameters ─────────────────────────────────────────────────────────────

/// Scan parameters, fixed at process start.
#[derive(Debug, Clone)]
pub struct SequenceParams {
    /// Number of output slots.
    pub max_layers: u32,
    /// Target spacing between consecutive slot expected-times.
    pub layer_interval: Duration,
    /// Freshness bound on the newest record.
    pub offset_from_now: Duration,
    /// Symmetric tolerance window around each slot's expected time.
    pub acceptable_range: Duration,
}

impl Default for SequenceParams {
    fn default() -> Self {
        Self {
            max_layers: 3,
            layer_interval: Duration::minutes(30),
            offset_from_now: Duration::weeks(2),
            acceptable_range: Duration::minutes(3),
        }
    }
}

impl SequenceParams {
    /// Expected capture time of slot `position` (1-based), anchored on the
    /// newest record.
    pub fn expected_time(&self, first_date: CaptureTime, position: u32) -> CaptureTime {
        first_date - self.layer_interval * (position - 1) as i32
    }

    /// Absolute cutoff: no record older than this can satisfy any slot.
    pub fn last_date(&self, first_date: CaptureTime) -> CaptureTime {
        first_date - self.layer_interval * self.max_layers as i32
    }
}

/// Tolerance window around one slot's expected time. Bounds are exclusive:
/// a record exactly `acceptable_range` away does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub expected: CaptureTime,
    pub low_end: CaptureTime,
    pub high_end: CaptureTime,
}

impl SlotWindow {
    pub fn around(expected: CaptureTime, acceptable_range: Duration) -> Self {
        Self {
            expected,
            low_end: expected - acceptable_range,
            high_end: expected + acceptable_range,
        }
    }

    pub fn contains(&self, t: CaptureTime) -> bool {
        self.low_end < t && t < self.high_end
    }
}

// ── Per-record outcomes ────────────────────────────────────────────────────

/// Decision for one record against the current slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// The record falls inside the current slot's window.
    Match,
    /// The scan has passed the current slot's window without a match; the
    /// slot can never be filled and falls back to a placeholder.
    Expire,
    /// The record does not advance the scan.
    Skip,
    /// The record is older than any slot could need.
    Cutoff,
}

/// Classify one record against the current slot.
///
/// Branch order follows the scan: match, then expiry, then cutoff, then
/// skip. The expiring record is consumed with the slot; it is not re-tested
/// against the next slot even if it would land inside that window.
pub fn classify(
    current: CaptureTime,
    window: SlotWindow,
    last_date: CaptureTime,
    slot_already_filled: bool,
) -> StepAction {
    if window.contains(current) {
        StepAction::Match
    } else if current <= window.low_end && !slot_already_filled {
        StepAction::Expire
    } else if current < last_date {
        StepAction::Cutoff
    } else {
        StepAction::Skip
    }
}

// ── Scan results ───────────────────────────────────────────────────────────

/// Why the scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// The newest record is older than the freshness bound; nothing rendered.
    Stale,
    /// Every slot was filled, with a capture or a placeholder.
    AllSlotsFilled,
    /// A record fell past the absolute cutoff with slots remaining.
    CutoffReached,
    /// The record list ran out with slots remaining; trailing slots get no
    /// artifact at all.
    RecordsExhausted,
}

/// How one slot was filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SlotOutcome {
    /// A feed record landed inside the slot's tolerance window.
    Matched {
        capture_time: CaptureTime,
        source: String,
    },
    /// The scan passed the window without a match; the artifact carries the
    /// slot's expected time, not any record's.
    Placeholder { expected_time: CaptureTime },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRecord {
    pub position: u32,
    pub outcome: SlotOutcome,
}

/// Outcome of one run. Slots absent from `slots` produced no artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub first_date: CaptureTime,
    pub termination: Termination,
    pub slots: Vec<SlotRecord>,
}

/// Errors that abort the scan. Placeholder fallback and staleness are
/// expected conditions, not errors.
#[derive(Debug)]
pub enum ScanError {
    /// The record list is empty; there is no newest record to anchor on.
    EmptyFeed,
    Timestamp(TimestampError),
    Render(RenderError),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFeed => write!(f, "feed contains no records"),
            Self::Timestamp(e) => write!(f, "{}", e),
            Self::Render(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EmptyFeed => None,
            Self::Timestamp(e) => Some(e),
            Self::Render(e) => Some(e),
        }
    }
}

impl From<TimestampError> for ScanError {
    fn from(e: TimestampError) -> Self {
        Self::Timestamp(e)
    }
}

impl From<RenderError> for ScanError {
    fn from(e: RenderError) -> Self {
        Self::Render(e)
    }
}

// ── The scan ───────────────────────────────────────────────────────────────

/// Run context, owned by the scan for the run's duration.
struct ScanState {
    target_position: u32,
    /// Slot position → filled-with-capture. At most one key per position;
    /// used only to test whether the current slot was already filled.
    success: HashMap<u32, bool>,
}

/// Single forward pass over the feed, rendering each slot as it resolves.
///
/// Renders happen inline during the scan, strictly sequentially; artifacts
/// written before a fatal error remain on disk. Returns the report of what
/// was rendered and why the scan stopped.
pub fn run_scan(
    records: &[FeedEntry],
    params: &SequenceParams,
    now: CaptureTime,
    renderer: &mut dyn SlotRenderer,
) -> Result<ScanReport, ScanError> {
    let first = records.first().ok_or(ScanError::EmptyFeed)?;
    let first_date = first.capture_time()?;

    // Precondition, not a per-slot rule: a stale feed ends the run cleanly
    // with zero artifacts.
    if first_date < now - params.offset_from_now {
        tracing::error!("Date of first capture is not recent enough.");
        return Ok(ScanReport {
            first_date,
            termination: Termination::Stale,
            slots: Vec::new(),
        });
    }

    let last_date = params.last_date(first_date);
    let mut state = ScanState {
        target_position: 1,
        success: HashMap::new(),
    };
    let mut slots = Vec::new();
    let mut cutoff_reached = false;

    for entry in records {
        if state.target_position > params.max_layers {
            break;
        }

        let current = entry.capture_time()?;
        let window = SlotWindow::around(
            params.expected_time(first_date, state.target_position),
            params.acceptable_range,
        );
        let already_filled = state.success.contains_key(&state.target_position);

        match classify(current, window, last_date, already_filled) {
            StepAction::Match => {
                let stamp = current.display_stamp();
                renderer.render_matched(&entry.source, &stamp, state.target_position)?;
                tracing::info!(
                    "Successfully processed layer {} with date {}.",
                    state.target_position,
                    stamp
                );
                state.success.insert(state.target_position, true);
                slots.push(SlotRecord {
                    position: state.target_position,
                    outcome: SlotOutcome::Matched {
                        capture_time: current,
                        source: entry.source.clone(),
                    },
                });
                state.target_position += 1;
            }
            StepAction::Expire => {
                let stamp = window.expected.display_stamp();
                renderer.render_placeholder(&stamp, state.target_position)?;
                tracing::error!(
                    "Failed to find layer data for position {} with expected date {}.",
                    state.target_position,
                    stamp
                );
                state.success.insert(state.target_position, false);
                slots.push(SlotRecord {
                    position: state.target_position,
                    outcome: SlotOutcome::Placeholder {
                        expected_time: window.expected,
                    },
                });
                state.target_position += 1;
            }
            StepAction::Cutoff => {
                cutoff_reached = true;
                break;
            }
            StepAction::Skip => {}
        }
    }

    let termination = if state.target_position > params.max_layers {
        Termination::AllSlotsFilled
    } else if cutoff_reached {
        Termination::CutoffReached
    } else {
        Termination::RecordsExhausted
    };

    Ok(ScanReport {
        first_date,
        termination,
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn t0_naive() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 1, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn t0() -> CaptureTime {
        CaptureTime::from_naive(t0_naive())
    }

    /// Feed entry `minutes_back` minutes before `t0`, AKST offset.
    fn entry(minutes_back: i64) -> FeedEntry {
        let at = t0_naive() - Duration::minutes(minutes_back);
        FeedEntry {
            event_at: format!("{}-09:00", at.format("%Y-%m-%dT%H:%M:%S")),
            source: format!("http://radar.test/{}.tif", at.format("%H%M%S")),
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Matched { source: String, stamp: String, position: u32 },
        Placeholder { stamp: String, position: u32 },
    }

    /// Records calls; optionally fails from the nth call on.
    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<Call>,
        fail_from: Option<usize>,
    }

    impl SlotRenderer for RecordingRenderer {
        fn render_matched(
            &mut self,
            source: &str,
            stamp: &str,
            position: u32,
        ) -> Result<(), RenderError> {
            if self.fail_from.is_some_and(|n| self.calls.len() >= n) {
                return Err(RenderError::SourceUnavailable(source.to_string()));
            }
            self.calls.push(Call::Matched {
                source: source.to_string(),
                stamp: stamp.to_string(),
                position,
            });
            Ok(())
        }

        fn render_placeholder(&mut self, stamp: &str, position: u32) -> Result<(), RenderError> {
            if self.fail_from.is_some_and(|n| self.calls.len() >= n) {
                return Err(RenderError::Io("disk full".to_string()));
            }
            self.calls.push(Call::Placeholder {
                stamp: stamp.to_string(),
                position,
            });
            Ok(())
        }
    }

    fn scan(records: &[FeedEntry]) -> (ScanReport, Vec<Call>) {
        let mut renderer = RecordingRenderer::default();
        let report = run_scan(records, &SequenceParams::default(), t0(), &mut renderer)
            .expect("scan should succeed");
        (report, renderer.calls)
    }

    #[test]
    fn dense_feed_fills_every_slot_from_captures() {
        // Scenario A: captures at exactly 0, 30 and 60 minutes back.
        let records = vec![entry(0), entry(30), entry(60)];
        let (report, calls) = scan(&records);

        assert_eq!(report.termination, Termination::AllSlotsFilled);
        assert_eq!(
            calls,
            vec![
                Call::Matched {
                    source: records[0].source.clone(),
                    stamp: "2016-01-30 12:00:00".to_string(),
                    position: 1,
                },
                Call::Matched {
                    source: records[1].source.clone(),
                    stamp: "2016-01-30 11:30:00".to_string(),
                    position: 2,
                },
                Call::Matched {
                    source: records[2].source.clone(),
                    stamp: "2016-01-30 11:00:00".to_string(),
                    position: 3,
                },
            ]
        );
        let positions: Vec<u32> = report.slots.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn gap_produces_placeholder_then_later_slot_still_matches() {
        // Scenario B: nothing near the slot-2 window; the record that skips
        // past it expires slot 2, and a third record fills slot 3.
        let records = vec![entry(0), entry(61), entry(62)];
        let (report, calls) = scan(&records);

        assert_eq!(report.termination, Termination::AllSlotsFilled);
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            Call::Placeholder {
                stamp: "2016-01-30 11:30:00".to_string(),
                position: 2,
            }
        );
        assert_eq!(
            calls[2],
            Call::Matched {
                source: records[2].source.clone(),
                stamp: "2016-01-30 10:58:00".to_string(),
                position: 3,
            }
        );
        assert_eq!(
            report.slots[1].outcome,
            SlotOutcome::Placeholder {
                expected_time: t0() - Duration::minutes(30),
            }
        );
    }

    #[test]
    fn stale_feed_renders_nothing() {
        // Scenario C: newest record three weeks old against a two-week bound.
        let records = vec![entry(60 * 24 * 21)];
        let (report, calls) = scan(&records);

        assert_eq!(report.termination, Termination::Stale);
        assert!(report.slots.is_empty());
        assert!(calls.is_empty());
    }

    #[test]
    fn feed_exactly_at_freshness_bound_is_not_stale() {
        let records = vec![entry(60 * 24 * 14)];
        let (report, _) = scan(&records);
        assert_ne!(report.termination, Termination::Stale);
    }

    #[test]
    fn exhausted_feed_leaves_trailing_slots_without_artifacts() {
        // Scenario D: two usable records, then nothing. Slot 3 gets no
        // artifact at all, distinct from a rendered placeholder.
        let records = vec![entry(0), entry(30)];
        let (report, calls) = scan(&records);

        assert_eq!(report.termination, Termination::RecordsExhausted);
        assert_eq!(calls.len(), 2);
        assert_eq!(report.slots.len(), 2);
        assert!(report.slots.iter().all(|s| s.position <= 2));
    }

    #[test]
    fn record_on_low_end_boundary_expires_the_slot() {
        // Exactly acceptable_range before the slot-2 expected time: the
        // strict window rejects it and the expiry branch consumes it.
        let records = vec![entry(0), entry(33)];
        let (report, calls) = scan(&records);

        assert_eq!(
            calls[1],
            Call::Placeholder {
                stamp: "2016-01-30 11:30:00".to_string(),
                position: 2,
            }
        );
        assert_eq!(report.termination, Termination::RecordsExhausted);
    }

    #[test]
    fn record_on_high_end_boundary_is_skipped() {
        // Exactly acceptable_range after the slot-2 expected time: no match,
        // no expiry (the window has not been passed), no slot advance.
        let records = vec![entry(0), entry(27)];
        let (report, calls) = scan(&records);

        assert_eq!(calls.len(), 1);
        assert_eq!(report.slots.len(), 1);
        assert_eq!(report.termination, Termination::RecordsExhausted);
    }

    #[test]
    fn duplicate_records_are_tolerated() {
        let records = vec![entry(0), entry(0), entry(30), entry(30), entry(60)];
        let (report, calls) = scan(&records);

        assert_eq!(report.termination, Termination::AllSlotsFilled);
        assert_eq!(calls.len(), 3);
        let positions: Vec<u32> = report.slots.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn expiring_record_is_consumed_not_retested() {
        // The record at 61 minutes back sits inside slot 3's window
        // (57..63 minutes back, exclusive) but first expires slot 2. The
        // scan consumes it with the expiry instead of re-testing it against
        // slot 3, so slot 3 stays empty here.
        let records = vec![entry(0), entry(61)];
        let (report, calls) = scan(&records);

        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            Call::Placeholder {
                stamp: "2016-01-30 11:30:00".to_string(),
                position: 2,
            }
        );
        assert_eq!(report.termination, Termination::RecordsExhausted);
        assert!(report.slots.iter().all(|s| s.position <= 2));
    }

    #[test]
    fn matched_stamp_is_the_record_time_not_the_expected_time() {
        // A capture 2 minutes off the slot target still matches; the stamp
        // carries the capture's own time.
        let records = vec![entry(0), entry(32)];
        let (_, calls) = scan(&records);

        assert_eq!(
            calls[1],
            Call::Matched {
                source: records[1].source.clone(),
                stamp: "2016-01-30 11:28:00".to_string(),
                position: 2,
            }
        );
    }

    #[test]
    fn unparseable_timestamp_mid_scan_is_fatal_but_keeps_prior_artifacts() {
        let mut records = vec![entry(0)];
        records.push(FeedEntry {
            event_at: "not-a-timestamp".to_string(),
            source: "http://radar.test/bad.tif".to_string(),
        });

        let mut renderer = RecordingRenderer::default();
        let err = run_scan(&records, &SequenceParams::default(), t0(), &mut renderer)
            .expect_err("bad timestamp should abort");
        assert!(matches!(err, ScanError::Timestamp(_)));
        assert_eq!(renderer.calls.len(), 1);
    }

    #[test]
    fn render_failure_is_fatal_and_not_downgraded() {
        let records = vec![entry(0), entry(30)];
        let mut renderer = RecordingRenderer {
            fail_from: Some(1),
            ..Default::default()
        };
        let err = run_scan(&records, &SequenceParams::default(), t0(), &mut renderer)
            .expect_err("render failure should abort");
        assert!(matches!(err, ScanError::Render(_)));
        assert_eq!(renderer.calls.len(), 1);
    }

    #[test]
    fn empty_feed_is_an_error() {
        let mut renderer = RecordingRenderer::default();
        let err = run_scan(&[], &SequenceParams::default(), t0(), &mut renderer).unwrap_err();
        assert!(matches!(err, ScanError::EmptyFeed));
    }

    #[test]
    fn window_boundaries_are_strict() {
        let expected = t0();
        let window = SlotWindow::around(expected, Duration::minutes(3));
        assert!(!window.contains(expected - Duration::minutes(3)));
        assert!(!window.contains(expected + Duration::minutes(3)));
        assert!(window.contains(expected - Duration::minutes(2)));
        assert!(window.contains(expected + Duration::minutes(2)));
        assert!(window.contains(expected));
    }

    #[test]
    fn classify_branch_order() {
        let params = SequenceParams::default();
        let first = t0();
        let window = SlotWindow::around(params.expected_time(first, 2), params.acceptable_range);
        let last = params.last_date(first);

        // In-window beats everything.
        assert_eq!(
            classify(first - Duration::minutes(30), window, last, false),
            StepAction::Match
        );
        // At-or-below low_end expires an unfilled slot, even past last_date.
        assert_eq!(
            classify(first - Duration::minutes(33), window, last, false),
            StepAction::Expire
        );
        assert_eq!(
            classify(first - Duration::minutes(120), window, last, false),
            StepAction::Expire
        );
        // A filled slot lets the cutoff comparison run.
        assert_eq!(
            classify(first - Duration::minutes(120), window, last, true),
            StepAction::Cutoff
        );
        // Newer than the window, not past cutoff: skip.
        assert_eq!(
            classify(first - Duration::minutes(10), window, last, false),
            StepAction::Skip
        );
    }
}
