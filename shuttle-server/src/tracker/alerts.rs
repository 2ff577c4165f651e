//! Arrival alert planning.
//!
//! A rider asks to be told `lead` minutes before the shuttle reaches a
//! stop. Planning picks the first arrival at least `lead` minutes out and
//! says how long to wait before firing. Delivering the alert is the
//! client's business.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::Serialize;

use crate::domain::{ServiceState, StopId};

use super::arrivals::ArrivalEntry;
use super::freshness::DataMode;

/// Lead times offered by the board, in minutes.
pub const ALERT_LEAD_PRESETS: [u32; 3] = [3, 5, 8];

/// Why an alert could not be planned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertError {
    #[error("service is paused; alerts are unavailable")]
    ServicePaused,

    #[error("unknown stop: {0}")]
    UnknownStop(StopId),

    #[error("invalid lead time: {0} minutes")]
    InvalidLead(f64),

    #[error("no arrival at {stop} is at least {lead_minutes} minutes away")]
    NoArrivalBeyondLead { stop: StopId, lead_minutes: f64 },
}

/// A scheduled alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPlan {
    pub stop: StopId,
    /// The arrival the alert is for, in minutes from now.
    pub eta_minutes: f64,
    pub lead_minutes: f64,
    /// Wait before firing, in milliseconds.
    pub delay_ms: i64,
    pub source: DataMode,
    pub source_label: &'static str,
}

impl AlertPlan {
    pub fn delay(&self) -> Duration {
        Duration::milliseconds(self.delay_ms)
    }
}

/// Plan an alert `lead_minutes` ahead of the next suitable arrival at `stop`.
pub fn plan_alert(
    arrivals: &BTreeMap<StopId, ArrivalEntry>,
    stop: &StopId,
    lead_minutes: f64,
    service: ServiceState,
) -> Result<AlertPlan, AlertError> {
    if !service.alerts_available() {
        return Err(AlertError::ServicePaused);
    }
    if !lead_minutes.is_finite() || lead_minutes < 0.0 {
        return Err(AlertError::InvalidLead(lead_minutes));
    }

    let entry = arrivals
        .get(stop)
        .ok_or_else(|| AlertError::UnknownStop(stop.clone()))?;

    let eta = entry
        .times
        .iter()
        .copied()
        .find(|&t| t >= lead_minutes)
        .ok_or_else(|| AlertError::NoArrivalBeyondLead {
            stop: stop.clone(),
            lead_minutes,
        })?;

    Ok(AlertPlan {
        stop: stop.clone(),
        eta_minutes: eta,
        lead_minutes,
        delay_ms: ((eta - lead_minutes) * 60_000.0).round() as i64,
        source: entry.source,
        source_label: entry.source_label,
    })
}
