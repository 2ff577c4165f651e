//! Stop identity and static stop configuration.

use std::fmt;

use serde::Serialize;

use super::geometry::RoutePoint;

/// Error returned when parsing an invalid stop id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stop id: {reason}")]
pub struct InvalidStopId {
    reason: &'static str,
}

/// Stable identifier of a stop (e.g. `commons`).
///
/// Stop ids are non-empty lowercase ASCII slugs: letters, digits, `-` and
/// `_`. They key the live ETA map and the schedule payload.
///
/// # Examples
///
/// ```
/// use shuttle_server::domain::StopId;
///
/// let id = StopId::parse("commons").unwrap();
/// assert_eq!(id.as_str(), "commons");
///
/// assert!(StopId::parse("").is_err());
/// assert!(StopId::parse("Commons").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    /// Parse a stop id, rejecting anything that is not a lowercase slug.
    pub fn parse(s: &str) -> Result<Self, InvalidStopId> {
        if s.is_empty() {
            return Err(InvalidStopId {
                reason: "must not be empty",
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(InvalidStopId {
                reason: "must be lowercase ASCII letters, digits, '-' or '_'",
            });
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fixed stop on the loop.
#[derive(Debug, Clone, Serialize)]
pub struct Stop {
    pub id: StopId,

    /// Display name.
    pub label: String,

    /// Position in route (map) coordinates.
    pub point: RoutePoint,

    /// Latitude, when known.
    pub lat: Option<f64>,

    /// Longitude, when known.
    pub lng: Option<f64>,

    /// Printed-timetable column headers that belong to this stop.
    ///
    /// A stop visited twice per loop appears as several columns
    /// (`"PDH"`, `"PDH (2)"`).
    #[serde(skip)]
    pub timetable_columns: Vec<String>,
}

/// A stop together with its projection onto the route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOnPath {
    #[serde(flatten)]
    pub stop: Stop,

    /// Fraction of the loop at which the stop sits, in `[0, 1]`.
    pub progress: f64,

    /// `x` divided by the route's drawing width.
    pub ratio_x: f64,

    /// `y` divided by the route's drawing height.
    pub ratio_y: f64,
}

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Find the stop closest to a rider's position.
///
/// Stops without coordinates are ignored. With no position, or no stop
/// carrying coordinates, the first stop is returned.
pub fn nearest_stop(stops: &[Stop], position: Option<(f64, f64)>) -> Option<&Stop> {
    let Some((lat, lng)) = position else {
        return stops.first();
    };

    let mut best: Option<(&Stop, f64)> = None;
    for stop in stops {
        let (Some(s_lat), Some(s_lng)) = (stop.lat, stop.lng) else {
            continue;
        };
        let dist = haversine_km(lat, lng, s_lat, s_lng);
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((stop, dist));
        }
    }

    best.map(|(stop, _)| stop).or_else(|| stops.first())
}
