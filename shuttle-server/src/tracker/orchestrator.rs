//! The tracker: owns the feed records and keeps them current.
//!
//! [`Tracker`] holds the latest state of every feed and derives the board
//! from it on demand. [`Refresher`] pairs a tracker with a feed source and
//! runs the refresh timers. Every fetch completion replaces its feed record
//! wholesale; completions that land after shutdown are dropped.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::{RouteGeometry, ServiceState, StopId, VehiclePosition, place_vehicles};
use crate::feeds::{
    FeedError, FeedKind, FeedSource, Incident, LiveFeed, ScheduleDocument, StatusPayload,
};
use crate::timetable::ScheduleSeries;

use super::arrivals::{ArrivalEntry, ArrivalInputs, compute_arrivals};
use super::config::TrackerConfig;
use super::freshness::{DataMode, ModeWatch, is_live_fresh};
use super::state::{FeedState, FeedStatus};
use super::telemetry::{Telemetry, TelemetryEvent};

/// The latest record of every feed.
#[derive(Debug, Default, Clone)]
pub struct FeedCache {
    pub live: FeedState<LiveFeed>,
    pub schedule: FeedState<ScheduleDocument>,
    /// Parsed once per successful schedule fetch.
    pub schedule_series: Option<Arc<ScheduleSeries>>,
    pub status: FeedState<StatusPayload>,
}

/// Service status as shown in the banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub title: &'static str,
    pub message: String,
    pub alerts_available: bool,
    pub updated_at: Option<String>,
    pub incidents: Vec<Incident>,
}

impl ServiceStatus {
    fn resolve(payload: Option<&StatusPayload>, default: ServiceState) -> Self {
        let state = ServiceState::resolve(payload.and_then(StatusPayload::raw_state), default);
        let message = payload
            .and_then(|p| p.message.as_deref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(state.default_message())
            .to_string();
        Self {
            state,
            title: state.title(),
            message,
            alerts_available: state.alerts_available(),
            updated_at: payload.and_then(|p| p.updated_at.clone()),
            incidents: payload.map(|p| p.incidents.clone()).unwrap_or_default(),
        }
    }
}

/// Fetch bookkeeping for one feed, without its data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHealth {
    pub status: FeedStatus,
    pub has_data: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl FeedHealth {
    fn of<T>(state: &FeedState<T>) -> Self {
        Self {
            status: state.status,
            has_data: state.data.is_some(),
            fetched_at: state.fetched_at,
            attempted_at: state.attempted_at,
            error: state.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSummary {
    pub live: FeedHealth,
    pub schedule: FeedHealth,
    pub status: FeedHealth,
}

/// Everything the board shows at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub mode: DataMode,
    pub live_fresh: bool,
    /// Live `updatedAt` (or fetch time) in live mode, schedule
    /// `generatedAt` (or fetch time) otherwise.
    pub last_updated: Option<DateTime<Utc>>,
    pub arrivals: BTreeMap<StopId, ArrivalEntry>,
    pub vehicles: Vec<VehiclePosition>,
    pub service: ServiceStatus,
}

/// Shared tracker state.
pub struct Tracker {
    config: TrackerConfig,
    route: Arc<RouteGeometry>,
    feeds: RwLock<FeedCache>,
    mode_watch: Mutex<ModeWatch>,
    telemetry: Telemetry,
    shutdown: watch::Sender<bool>,
}

impl Tracker {
    pub fn new(config: TrackerConfig, route: Arc<RouteGeometry>, telemetry: Telemetry) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            route,
            feeds: RwLock::new(FeedCache::default()),
            mode_watch: Mutex::new(ModeWatch::new()),
            telemetry,
            shutdown,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn route(&self) -> &Arc<RouteGeometry> {
        &self.route
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Stop accepting fetch results and end the refresh loops.
    pub fn shutdown(&self) {
        info!("tracker shutting down");
        self.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// A copy of the current feed records.
    pub async fn feeds(&self) -> FeedCache {
        self.feeds.read().await.clone()
    }

    /// Record the outcome of a live fetch made at `at`.
    ///
    /// A successful feed's `received_at`, when earlier, is its fetch time.
    pub async fn apply_live(&self, result: Result<LiveFeed, FeedError>, at: DateTime<Utc>) -> FeedStatus {
        if self.discard_late(FeedKind::Live) {
            return FeedStatus::Idle;
        }
        let status = {
            let mut feeds = self.feeds.write().await;
            feeds.live = match result {
                Ok(feed) => {
                    debug!(
                        vehicles = feed.vehicles.len(),
                        stops = feed.etas.len(),
                        "live feed updated"
                    );
                    // ETAs decay from when the body was received, which
                    // predates `at` for a cached copy.
                    let fetched_at = feed.received_at.filter(|t| *t <= at).unwrap_or(at);
                    FeedState::succeeded(feed, fetched_at)
                }
                Err(e) => {
                    error!(feed = "live", error = %e, "failed to load live ETAs");
                    self.telemetry.record(TelemetryEvent::LiveEtaError {
                        message: e.to_string(),
                    });
                    feeds.live.failed(e.to_string(), at)
                }
            };
            feeds.live.status
        };
        self.tick(at).await;
        status
    }

    /// Record the outcome of a schedule fetch, parsing it on success.
    pub async fn apply_schedule(
        &self,
        result: Result<ScheduleDocument, FeedError>,
        at: DateTime<Utc>,
    ) -> FeedStatus {
        if self.discard_late(FeedKind::Schedule) {
            return FeedStatus::Idle;
        }
        let mut feeds = self.feeds.write().await;
        match result {
            Ok(doc) => {
                let series = ScheduleSeries::from_document(&doc, &self.route.plain_stops());
                info!(stops = series.len(), "schedule loaded");
                if series.is_empty() {
                    warn!("schedule has no stops the route knows");
                }
                feeds.schedule_series = Some(Arc::new(series));
                feeds.schedule = FeedState::succeeded(doc, at);
            }
            Err(e) => {
                error!(feed = "schedule", error = %e, "failed to load schedule");
                feeds.schedule = feeds.schedule.failed(e.to_string(), at);
            }
        }
        feeds.schedule.status
    }

    /// Record the outcome of a status fetch.
    pub async fn apply_status(
        &self,
        result: Result<StatusPayload, FeedError>,
        at: DateTime<Utc>,
    ) -> FeedStatus {
        if self.discard_late(FeedKind::Status) {
            return FeedStatus::Idle;
        }
        let mut feeds = self.feeds.write().await;
        feeds.status = match result {
            Ok(payload) => {
                debug!(state = ?payload.raw_state(), "status updated");
                FeedState::succeeded(payload, at)
            }
            Err(e) => {
                error!(feed = "status", error = %e, "failed to load service status");
                feeds.status.failed(e.to_string(), at)
            }
        };
        feeds.status.status
    }

    fn discard_late(&self, kind: FeedKind) -> bool {
        let late = self.is_shut_down();
        if late {
            debug!(feed = %kind, "discarding fetch result after shutdown");
        }
        late
    }

    /// Re-run the freshness check, reporting a fallback if live just lapsed.
    pub async fn tick(&self, now: DateTime<Utc>) -> DataMode {
        let (mode, live_status) = {
            let feeds = self.feeds.read().await;
            let fresh = is_live_fresh(&feeds.live, &now, self.config.stale_after());
            let mode = if fresh { DataMode::Live } else { DataMode::Schedule };
            (mode, feeds.live.status)
        };

        let fallback = self.mode_watch.lock().await.observe(mode, live_status);
        if let Some(reason) = fallback {
            warn!(reason = reason.as_str(), "live data unavailable, using schedule");
            self.telemetry.record(TelemetryEvent::FallbackUsed { reason });
        }
        mode
    }

    /// The current service status.
    pub async fn service(&self) -> ServiceStatus {
        let feeds = self.feeds.read().await;
        ServiceStatus::resolve(feeds.status.data(), self.config.default_service_state)
    }

    pub async fn feed_summary(&self) -> FeedSummary {
        let feeds = self.feeds.read().await;
        FeedSummary {
            live: FeedHealth::of(&feeds.live),
            schedule: FeedHealth::of(&feeds.schedule),
            status: FeedHealth::of(&feeds.status),
        }
    }

    /// Build the board as of `clock`.
    ///
    /// `clock`'s time zone is the one schedule times are read in.
    pub async fn snapshot<Tz: TimeZone>(&self, clock: &DateTime<Tz>) -> BoardSnapshot {
        let feeds = self.feeds.read().await;
        let now = clock.with_timezone(&Utc);

        let live_fresh = is_live_fresh(&feeds.live, &now, self.config.stale_after());
        let mode = if live_fresh { DataMode::Live } else { DataMode::Schedule };

        let inputs = ArrivalInputs {
            mode,
            live: feeds.live.data(),
            live_fetched_at: feeds.live.fetched_at,
            schedule: feeds.schedule_series.as_deref(),
        };
        let stop_ids = self.route.stops().iter().map(|s| &s.stop.id);
        let arrivals = compute_arrivals(stop_ids, &inputs, clock);

        let last_updated = match mode {
            DataMode::Live => feeds
                .live
                .data()
                .and_then(LiveFeed::updated_at)
                .or(feeds.live.fetched_at),
            DataMode::Schedule => feeds
                .schedule
                .data()
                .and_then(ScheduleDocument::generated_at)
                .or(feeds.schedule.fetched_at),
        };

        let vehicles = match (feeds.live.is_success(), feeds.live.data(), feeds.live.fetched_at) {
            (true, Some(feed), Some(fetched_at)) => place_vehicles(
                &feed.vehicles,
                &self.route,
                now - fetched_at,
                self.config.loop_duration(),
            ),
            _ => Vec::new(),
        };

        BoardSnapshot {
            mode,
            live_fresh,
            last_updated,
            arrivals,
            vehicles,
            service: ServiceStatus::resolve(feeds.status.data(), self.config.default_service_state),
        }
    }
}

/// Manual live refresh, with the feed source type erased.
pub trait ManualRefresh: Send + Sync {
    fn refresh_now(&self) -> BoxFuture<'_, FeedStatus>;
}

/// Drives a tracker from a feed source.
pub struct Refresher<S> {
    tracker: Arc<Tracker>,
    source: S,
}

impl<S: FeedSource> Refresher<S> {
    pub fn new(tracker: Arc<Tracker>, source: S) -> Self {
        Self { tracker, source }
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    pub async fn refresh_live(&self) -> FeedStatus {
        let result = self.source.fetch_live().await;
        self.tracker.apply_live(result, Utc::now()).await
    }

    pub async fn refresh_schedule(&self) -> FeedStatus {
        let result = self.source.fetch_schedule().await;
        self.tracker.apply_schedule(result, Utc::now()).await
    }

    pub async fn refresh_status(&self) -> FeedStatus {
        let result = self.source.fetch_status().await;
        self.tracker.apply_status(result, Utc::now()).await
    }

    /// Start the refresh timers.
    ///
    /// The schedule is fetched once. Live and status feeds are fetched
    /// immediately and then on their intervals, and the clock tick re-runs
    /// the freshness check. All loops end on [`Tracker::shutdown`].
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let config = self.tracker.config().clone();

        let schedule = {
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                this.refresh_schedule().await;
            })
        };

        let live = spawn_every(config.live_interval(), self.tracker.shutdown_signal(), {
            let this = Arc::clone(&self);
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.refresh_live().await;
                }
            }
        });

        let status = spawn_every(config.status_interval(), self.tracker.shutdown_signal(), {
            let this = Arc::clone(&self);
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.refresh_status().await;
                }
            }
        });

        let tick = spawn_every(config.tick_interval(), self.tracker.shutdown_signal(), {
            let tracker = Arc::clone(&self.tracker);
            move || {
                let tracker = Arc::clone(&tracker);
                async move {
                    tracker.tick(Utc::now()).await;
                }
            }
        });

        vec![schedule, live, status, tick]
    }
}

impl<S: FeedSource> ManualRefresh for Refresher<S> {
    fn refresh_now(&self) -> BoxFuture<'_, FeedStatus> {
        Box::pin(self.refresh_live())
    }
}

/// Run `job` now and then every `period` until shutdown.
fn spawn_every<F, Fut>(
    period: StdDuration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => job().await,
                _ = shutdown.changed() => break,
            }
        }
    })
}
