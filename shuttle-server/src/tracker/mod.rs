//! Arrival tracking.
//!
//! This module turns feed records into the arrival board:
//!
//! 1. **Freshness**: decide whether live data can be trusted this tick
//! 2. **Arrivals**: build per-stop arrival lists from live ETAs or the schedule
//! 3. **Alerts**: plan "tell me N minutes before" notifications
//!
//! The [`Tracker`] owns the feed records; a [`Refresher`] keeps them current
//! from a [`FeedSource`](crate::feeds::FeedSource).

mod alerts;
mod arrivals;
mod config;
mod freshness;
mod orchestrator;
mod state;
mod telemetry;

pub use alerts::{ALERT_LEAD_PRESETS, AlertError, AlertPlan, plan_alert};
pub use arrivals::{ArrivalEntry, ArrivalInputs, compute_arrivals};
pub use config::TrackerConfig;
pub use freshness::{DataMode, FallbackReason, ModeWatch, is_live_fresh, select_mode};
pub use orchestrator::{
    BoardSnapshot, FeedCache, FeedHealth, FeedSummary, ManualRefresh, Refresher, ServiceStatus,
    Tracker,
};
pub use state::{FeedState, FeedStatus};
pub use telemetry::{Telemetry, TelemetryEvent};
