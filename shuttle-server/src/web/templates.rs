//! Askama templates for the arrival board page.

use askama::Template;

use crate::domain::{RouteGeometry, StopOnPath, format_relative_minutes};
use crate::tracker::{ALERT_LEAD_PRESETS, ArrivalEntry, BoardSnapshot, DataMode, ServiceStatus};

/// How many arrivals after the next one each stop row lists.
const LATER_ARRIVALS: usize = 2;

/// The arrival board.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub service: ServiceView,
    pub mode_label: &'static str,
    pub live: bool,
    pub last_updated: String,
    pub stops: Vec<StopRowView>,
    pub map: MapView,
    pub lead_presets: Vec<u32>,
}

impl IndexTemplate {
    pub fn new(snapshot: &BoardSnapshot, route: &RouteGeometry, last_updated: String) -> Self {
        let stops = route
            .stops()
            .iter()
            .map(|stop| StopRowView::new(stop, snapshot.arrivals.get(&stop.stop.id)))
            .collect();

        Self {
            service: ServiceView::from_status(&snapshot.service),
            mode_label: snapshot.mode.label(),
            live: snapshot.mode == DataMode::Live,
            last_updated,
            stops,
            map: MapView::new(route, snapshot),
            lead_presets: ALERT_LEAD_PRESETS.to_vec(),
        }
    }
}

// ============================================================================
// View Models (for templates)
// ============================================================================

/// Service banner.
#[derive(Debug, Clone)]
pub struct ServiceView {
    pub state: &'static str,
    pub title: &'static str,
    pub message: String,
    pub alerts_available: bool,
    pub incidents: Vec<IncidentView>,
}

impl ServiceView {
    pub fn from_status(status: &ServiceStatus) -> Self {
        Self {
            state: status.state.as_str(),
            title: status.title,
            message: status.message.clone(),
            alerts_available: status.alerts_available,
            incidents: status
                .incidents
                .iter()
                .map(|i| IncidentView {
                    title: i.title.clone(),
                    detail: i.detail.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IncidentView {
    pub title: String,
    pub detail: String,
}

/// One row of the board.
#[derive(Debug, Clone)]
pub struct StopRowView {
    pub id: String,
    pub label: String,
    /// Countdown to the next arrival, e.g. "in 4m"
    pub next: String,
    /// Printed time of the next arrival, schedule only
    pub next_clock: Option<String>,
    pub later: Vec<String>,
    pub source_label: &'static str,
}

impl StopRowView {
    pub fn new(stop: &StopOnPath, entry: Option<&ArrivalEntry>) -> Self {
        let times = entry.map(|e| e.times.as_slice()).unwrap_or(&[]);
        Self {
            id: stop.stop.id.to_string(),
            label: stop.stop.label.clone(),
            next: format_relative_minutes(times.first().copied()),
            next_clock: entry
                .and_then(|e| e.labels.as_ref())
                .and_then(|labels| labels.first().cloned()),
            later: times
                .iter()
                .skip(1)
                .take(LATER_ARRIVALS)
                .map(|&t| format_relative_minutes(Some(t)))
                .collect(),
            source_label: entry
                .map(|e| e.source_label)
                .unwrap_or(DataMode::Schedule.label()),
        }
    }
}

/// A labelled dot on the map.
#[derive(Debug, Clone)]
pub struct MapMarker {
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// SVG map of the loop.
#[derive(Debug, Clone)]
pub struct MapView {
    pub width: f64,
    pub height: f64,
    /// `points` attribute for the route polygon
    pub path: String,
    pub stops: Vec<MapMarker>,
    pub vehicles: Vec<MapMarker>,
}

impl MapView {
    pub fn new(route: &RouteGeometry, snapshot: &BoardSnapshot) -> Self {
        let outline = route.outline();
        let path = outline
            .points
            .iter()
            .map(|p| format!("{},{}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            width: outline.width,
            height: outline.height,
            path,
            stops: route
                .stops()
                .iter()
                .map(|s| MapMarker {
                    label: s.stop.label.clone(),
                    x: s.stop.point.x,
                    y: s.stop.point.y,
                })
                .collect(),
            vehicles: snapshot
                .vehicles
                .iter()
                .map(|v| MapMarker {
                    label: v.id.clone(),
                    x: v.point.x,
                    y: v.point.y,
                })
                .collect(),
        }
    }
}
