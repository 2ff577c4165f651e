//! Feed payload DTOs.
//!
//! These types map directly to the JSON the live, schedule and status feeds
//! serve. Feeds are hand-maintained and sloppy, so nearly every field is
//! defaulted and numeric fields tolerate junk.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{StopId, Vehicle, lenient_f64};

/// Date-time layouts accepted without an offset, read as local time.
const LOCAL_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO 8601 timestamp into UTC.
///
/// Stamps with an offset are taken as given. Date-times without one are
/// server-local time, and a bare date is midnight UTC. Anything else is
/// `None`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }

    if let Some(naive) = LOCAL_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
    {
        return Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Live vehicle positions and per-stop ETAs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeed {
    /// When the feed producer last updated (ISO 8601).
    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub vehicles: Vec<Vehicle>,

    /// ETAs keyed by stop id. A stop whose list is not an array has no
    /// ETAs, and list items that are not objects are dropped.
    #[serde(default, deserialize_with = "lenient_etas")]
    pub etas: BTreeMap<String, Vec<LiveEta>>,

    /// When this body came off the wire. Set by the source, so a cached
    /// copy keeps its original receipt time.
    #[serde(skip)]
    pub received_at: Option<DateTime<Utc>>,
}

fn lenient_etas<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<LiveEta>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(stops) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(stops
        .into_iter()
        .map(|(stop, list)| {
            let etas = match list {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
                _ => Vec::new(),
            };
            (stop, etas)
        })
        .collect())
}

impl LiveFeed {
    /// The producer's update time, if present and parseable.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at.as_deref().and_then(parse_timestamp)
    }

    /// True when at least one stop has a non-empty ETA list.
    pub fn has_arrivals(&self) -> bool {
        self.etas.values().any(|list| !list.is_empty())
    }

    /// ETA entries for a stop.
    pub fn etas_for(&self, stop: &StopId) -> &[LiveEta] {
        self.etas
            .get(stop.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One predicted arrival at a stop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEta {
    #[serde(default)]
    pub vehicle_id: Option<String>,

    /// Minutes until arrival, as of the feed fetch.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub eta_minutes: Option<f64>,
}

/// Per-stop scheduled clock times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePayload {
    #[serde(default)]
    pub generated_at: Option<String>,

    /// Clock strings ("H:MM", optionally with AM/PM) keyed by stop id.
    #[serde(default)]
    pub stops: BTreeMap<String, Vec<String>>,
}

/// A schedule as served: either structured JSON or a pasted printed table.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleDocument {
    Payload(SchedulePayload),

    /// Tab- or space-separated timetable text.
    Timetable(String),
}

impl ScheduleDocument {
    /// Interpret a response body: JSON objects are payloads, anything else
    /// is timetable text.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        if body.trim_start().starts_with('{') {
            serde_json::from_str(body).map(Self::Payload)
        } else {
            Ok(Self::Timetable(body.to_string()))
        }
    }

    /// The generation time stamped into a JSON payload.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Payload(p) => p.generated_at.as_deref().and_then(parse_timestamp),
            Self::Timetable(_) => None,
        }
    }
}

/// Operator service status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    /// "on", "off" or "limited".
    #[serde(default)]
    pub state: Option<String>,

    /// Older feeds use `service` instead of `state`.
    #[serde(default)]
    pub service: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub incidents: Vec<Incident>,
}

impl StatusPayload {
    /// The raw state string, preferring `state` over `service`.
    pub fn raw_state(&self) -> Option<&str> {
        self.state.as_deref().or(self.service.as_deref())
    }
}

/// A service incident shown under the status banner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}
