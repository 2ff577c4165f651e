//! Data transfer objects for web requests and responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{RouteOutline, StopId, StopOnPath, VehiclePosition};
use crate::tracker::{
    AlertPlan, ArrivalEntry, DataMode, FeedStatus, FeedSummary, ServiceStatus,
};

/// Arrival board.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalsResponse {
    pub mode: DataMode,

    /// "Live ETA" or "Schedule estimate"
    pub label: &'static str,

    pub live_fresh: bool,

    pub last_updated: Option<DateTime<Utc>>,

    /// `HH:MM:SS` in server local time, or "—"
    pub last_updated_label: String,

    pub arrivals: BTreeMap<StopId, ArrivalEntry>,
}

/// Route outline and stops, for drawing the map.
#[derive(Debug, Serialize)]
pub struct StopsResponse<'a> {
    pub route: RouteOutline<'a>,
    pub stops: &'a [StopOnPath],
}

/// Query for the stop nearest a rider.
#[derive(Debug, Deserialize)]
pub struct NearestStopQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestStopResponse<'a> {
    pub stop: &'a StopOnPath,

    /// Great-circle distance to the stop, when both positions are known
    pub distance_km: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclesResponse {
    pub mode: DataMode,
    pub vehicles: Vec<VehiclePosition>,
}

/// Service banner plus feed bookkeeping.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: ServiceStatus,
    pub feeds: FeedSummary,
    pub telemetry: BTreeMap<String, u64>,
}

/// Query for planning an arrival alert.
#[derive(Debug, Deserialize)]
pub struct AlertPlanQuery {
    pub stop: String,

    /// Minutes of warning wanted (defaults to 5)
    pub lead: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPlanResponse {
    #[serde(flatten)]
    pub plan: AlertPlan,

    /// When the alert should fire
    pub fire_at: DateTime<Utc>,
}

/// Outcome of a manual live refresh.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: FeedStatus,
    pub mode: DataMode,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
