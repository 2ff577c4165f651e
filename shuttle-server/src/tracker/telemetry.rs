//! Operational event reporting.
//!
//! Events are counted, logged through `tracing`, and, when an endpoint is
//! configured, POSTed as JSON without waiting for the response. Losing an
//! event is acceptable; blocking a refresh on the sink is not.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::freshness::FallbackReason;

/// Something worth counting.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// The board dropped from live to schedule.
    FallbackUsed { reason: FallbackReason },

    /// A live feed fetch failed.
    LiveEtaError { message: String },
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::FallbackUsed { .. } => "fallback_used",
            TelemetryEvent::LiveEtaError { .. } => "live_eta_error",
        }
    }

    fn payload(&self) -> Value {
        match self {
            TelemetryEvent::FallbackUsed { reason } => json!({ "reason": reason.as_str() }),
            TelemetryEvent::LiveEtaError { message } => json!({ "message": message }),
        }
    }
}

/// Body POSTed to the telemetry endpoint.
#[derive(Debug, Serialize)]
struct TelemetryRecord<'a> {
    event: &'a str,
    count: u64,
    payload: Value,
    /// Unix milliseconds.
    timestamp: i64,
}

/// Event counters plus an optional HTTP sink.
#[derive(Debug, Default)]
pub struct Telemetry {
    counters: Mutex<BTreeMap<&'static str, u64>>,
    sink: Option<(reqwest::Client, String)>,
}

impl Telemetry {
    /// Telemetry that only counts and logs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Telemetry that also POSTs each event to `url`.
    pub fn with_endpoint(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            counters: Mutex::default(),
            sink: Some((http, url.into())),
        })
    }

    /// Count, log and ship an event. Returns the event's new count.
    pub fn record(&self, event: TelemetryEvent) -> u64 {
        let name = event.name();
        let count = {
            let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
            let count = counters.entry(name).or_insert(0);
            *count += 1;
            *count
        };

        let payload = event.payload();
        info!(event = name, count, %payload, "telemetry");

        if let Some((http, url)) = &self.sink {
            self.ship(http, url, name, count, payload);
        }
        count
    }

    fn ship(&self, http: &reqwest::Client, url: &str, event: &str, count: u64, payload: Value) {
        // Outside a runtime (sync tests, shutdown) there is nowhere to send from.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let record = TelemetryRecord {
            event,
            count,
            payload,
            timestamp: Utc::now().timestamp_millis(),
        };
        let request = http.post(url).json(&record);
        runtime.spawn(async move {
            if let Err(e) = request.send().await.and_then(|r| r.error_for_status()) {
                warn!(error = %e, "telemetry POST failed");
            }
        });
    }

    /// Snapshot of all counters.
    pub fn counters(&self) -> BTreeMap<String, u64> {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    pub fn count(&self, event: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.get(event).copied().unwrap_or(0)
    }
}
