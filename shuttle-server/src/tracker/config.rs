//! Tracker configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::domain::{LOOP_DURATION_MINS, ServiceState};

/// Timing and fallback parameters for the tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How old live data may be before falling back to the schedule (ms).
    pub stale_after_ms: i64,

    /// Live feed refresh period (seconds).
    pub live_interval_secs: u64,

    /// Status feed refresh period (seconds).
    pub status_interval_secs: u64,

    /// Clock tick period (seconds). Each tick re-runs the freshness check.
    pub tick_interval_secs: u64,

    /// Minutes for one vehicle to complete the loop.
    pub loop_duration_mins: i64,

    /// Service state used when the status feed is silent or unrecognised.
    pub default_service_state: ServiceState,
}

impl TrackerConfig {
    /// Returns the staleness window as a Duration.
    pub fn stale_after(&self) -> Duration {
        Duration::milliseconds(self.stale_after_ms)
    }

    /// Returns the loop time as a Duration.
    pub fn loop_duration(&self) -> Duration {
        Duration::minutes(self.loop_duration_mins)
    }

    pub fn live_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.live_interval_secs.max(1))
    }

    pub fn status_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.status_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.tick_interval_secs.max(1))
    }

    pub fn with_stale_after_ms(mut self, ms: i64) -> Self {
        self.stale_after_ms = ms;
        self
    }

    pub fn with_default_service_state(mut self, state: ServiceState) -> Self {
        self.default_service_state = state;
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: 45_000,
            live_interval_secs: 30,
            status_interval_secs: 60,
            tick_interval_secs: 15,
            loop_duration_mins: LOOP_DURATION_MINS,
            default_service_state: ServiceState::On,
        }
    }
}
