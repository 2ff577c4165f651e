//! Vehicles on the loop and their drawing positions.
//!
//! Vehicles are independent of one another. A feed may report a vehicle's
//! progress; when it does not, vehicles are spread evenly around the loop.
//! Between feed updates every vehicle advances at a constant rate of one
//! loop per [`LOOP_DURATION_MINS`].

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize};

use super::geometry::{RoutePoint, wrap_progress};
use super::route::RouteGeometry;

/// Time for a shuttle to complete one loop, in minutes.
pub const LOOP_DURATION_MINS: i64 = 18;

/// A vehicle as reported by the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Feed-assigned id. May be empty in sloppy feeds.
    #[serde(default)]
    pub id: String,

    /// Fraction of the loop completed, if the feed knows it.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub progress: Option<f64>,
}

/// Where a vehicle should be drawn right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub id: String,
    pub progress: f64,
    pub point: RoutePoint,

    /// True when the feed gave no progress and the position is a spread estimate.
    pub estimated: bool,
}

/// Accept a JSON number as `Some`, and anything else (string, bool, null) as `None`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

/// Progress of vehicle `index` of `count`, `elapsed` after the feed was read.
///
/// Reported progress is used when present; otherwise the vehicle is placed at
/// `index / count` around the loop. Either way it then advances by
/// `elapsed / loop_duration` and wraps into `[0, 1)`.
pub fn vehicle_progress(
    reported: Option<f64>,
    index: usize,
    count: usize,
    elapsed: Duration,
    loop_duration: Duration,
) -> f64 {
    let base = reported.unwrap_or(index as f64 / count.max(1) as f64);
    let loop_ms = loop_duration.num_milliseconds();
    let advance = if loop_ms > 0 {
        elapsed.num_milliseconds().max(0) as f64 / loop_ms as f64
    } else {
        0.0
    };
    wrap_progress(base + advance)
}

/// Place every vehicle on the route.
pub fn place_vehicles(
    vehicles: &[Vehicle],
    geometry: &RouteGeometry,
    elapsed: Duration,
    loop_duration: Duration,
) -> Vec<VehiclePosition> {
    vehicles
        .iter()
        .enumerate()
        .map(|(index, vehicle)| {
            let progress = vehicle_progress(
                vehicle.progress,
                index,
                vehicles.len(),
                elapsed,
                loop_duration,
            );
            let id = if vehicle.id.is_empty() {
                format!("vehicle-{index}")
            } else {
                vehicle.id.clone()
            };
            VehiclePosition {
                id,
                progress,
                point: geometry.position_at(progress),
                estimated: vehicle.progress.is_none(),
            }
        })
        .collect()
}
