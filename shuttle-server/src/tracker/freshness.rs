//! Live-versus-schedule arbitration.
//!
//! Each tick the tracker asks one question: is the live feed trustworthy
//! right now? The answer depends only on the current feed record and the
//! clock. [`ModeWatch`] remembers the previous answer, but only to report
//! live-to-schedule fallbacks; it never influences the decision.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone};
use serde::Serialize;

use crate::feeds::LiveFeed;

use super::state::{FeedState, FeedStatus};

/// Which source the arrival board is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    Live,
    Schedule,
}

impl DataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Live => "live",
            DataMode::Schedule => "schedule",
        }
    }

    /// Board caption for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            DataMode::Live => "Live ETA",
            DataMode::Schedule => "Schedule estimate",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if the live feed should drive the board at `clock`.
///
/// Requires a successful last fetch, at least one stop with a non-empty ETA
/// list, and data no older than `stale_after`. Age is measured from the
/// feed's own `updatedAt` when it parses, otherwise from the fetch time.
/// Timestamps in the future count as fresh.
pub fn is_live_fresh<Tz: TimeZone>(
    live: &FeedState<LiveFeed>,
    clock: &DateTime<Tz>,
    stale_after: Duration,
) -> bool {
    if live.status != FeedStatus::Success {
        return false;
    }
    let Some(feed) = live.data() else {
        return false;
    };
    if !feed.has_arrivals() {
        return false;
    }

    let Some(reference) = feed.updated_at().or(live.fetched_at) else {
        return false;
    };
    let age_ms = clock.timestamp_millis() - reference.timestamp_millis();
    age_ms <= stale_after.num_milliseconds()
}

/// The mode for this tick.
pub fn select_mode<Tz: TimeZone>(
    live: &FeedState<LiveFeed>,
    clock: &DateTime<Tz>,
    stale_after: Duration,
) -> DataMode {
    if is_live_fresh(live, clock, stale_after) {
        DataMode::Live
    } else {
        DataMode::Schedule
    }
}

/// Why the board left live mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackReason {
    /// The last fetch succeeded but the data aged out (or had no ETAs).
    Stale,
    /// The last fetch failed.
    Error,
    /// Nothing has been fetched yet.
    Idle,
}

impl FallbackReason {
    pub fn from_status(status: FeedStatus) -> Self {
        match status {
            FeedStatus::Success => FallbackReason::Stale,
            FeedStatus::Error => FallbackReason::Error,
            FeedStatus::Idle => FallbackReason::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Stale => "stale",
            FallbackReason::Error => "error",
            FallbackReason::Idle => "idle",
        }
    }
}

/// Detects live-to-schedule transitions between ticks.
#[derive(Debug, Default)]
pub struct ModeWatch {
    previous: Option<DataMode>,
}

impl ModeWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this tick's mode. Returns the fallback reason when the board
    /// just dropped from live to schedule.
    pub fn observe(&mut self, mode: DataMode, live_status: FeedStatus) -> Option<FallbackReason> {
        let fell_back = self.previous == Some(DataMode::Live) && mode == DataMode::Schedule;
        self.previous = Some(mode);
        fell_back.then(|| FallbackReason::from_status(live_status))
    }

    pub fn previous(&self) -> Option<DataMode> {
        self.previous
    }
}
