//! The campus loop: static route polyline, stops, and the derived geometry.

use std::sync::Arc;

use serde::Serialize;

use super::geometry::{ArcLengthTable, RoutePoint, point_at_progress, project_point};
use super::stop::{Stop, StopId, StopOnPath};

/// Drawing width of the route coordinate system.
pub const ROUTE_WIDTH: f64 = 1000.0;

/// Drawing height of the route coordinate system.
pub const ROUTE_HEIGHT: f64 = 580.0;

/// The loop traced over the campus map, in drawing coordinates.
///
/// Starts at the west (COB) spur and finishes back at the Commons junction.
const CAMPUS_ROUTE: &[(f64, f64)] = &[
    (70.0, 70.0),
    (250.0, 70.0),
    (250.0, 150.0),
    (70.0, 150.0),
    (70.0, 70.0),
    (330.0, 70.0),
    (520.0, 70.0),
    (610.0, 70.0),
    (610.0, 70.0),
    (610.0, 140.0),
    (720.0, 140.0),
    (720.0, 70.0),
    (880.0, 70.0),
    (960.0, 140.0),
    (880.0, 210.0),
    (800.0, 250.0),
    (720.0, 260.0),
    (650.0, 270.0),
    (600.0, 300.0),
    (560.0, 330.0),
    (520.0, 360.0),
    (470.0, 340.0),
    (420.0, 320.0),
    (360.0, 300.0),
    (320.0, 300.0),
    (300.0, 320.0),
    (280.0, 350.0),
    (260.0, 420.0),
    (340.0, 420.0),
    (430.0, 420.0),
    (520.0, 420.0),
    (600.0, 420.0),
    (720.0, 420.0),
    (720.0, 470.0),
    (540.0, 470.0),
    (430.0, 470.0),
    (320.0, 470.0),
    (210.0, 470.0),
    (130.0, 470.0),
    (130.0, 410.0),
    (180.0, 360.0),
    (220.0, 320.0),
    (250.0, 280.0),
    (270.0, 240.0),
    (300.0, 200.0),
    (340.0, 170.0),
    (380.0, 150.0),
    (430.0, 130.0),
    (520.0, 120.0),
    (610.0, 120.0),
    (610.0, 70.0),
];

struct StopSeed {
    id: &'static str,
    label: &'static str,
    x: f64,
    y: f64,
    lat: f64,
    lng: f64,
    columns: &'static [&'static str],
}

const CAMPUS_STOPS: &[StopSeed] = &[
    StopSeed {
        id: "commons",
        label: "L3Harris Commons",
        x: 670.0,
        y: 100.0,
        lat: 28.0646,
        lng: -80.6234,
        columns: &["Commons", "Commons (2)"],
    },
    StopSeed {
        id: "wfit",
        label: "Gleason & WFIT",
        x: 560.0,
        y: 210.0,
        lat: 28.0643,
        lng: -80.6244,
        columns: &["WFIT"],
    },
    StopSeed {
        id: "miller",
        label: "John E. Miller (Academic Quad)",
        x: 360.0,
        y: 280.0,
        lat: 28.0639,
        lng: -80.6249,
        columns: &["Miller Bldg."],
    },
    StopSeed {
        id: "res",
        label: "Residence Hall Circle",
        x: 300.0,
        y: 420.0,
        lat: 28.0632,
        lng: -80.6256,
        columns: &["Dorm Circle"],
    },
    StopSeed {
        id: "olin",
        label: "Between Olin Engineering",
        x: 480.0,
        y: 310.0,
        lat: 28.0641,
        lng: -80.6249,
        columns: &["Olin Quad"],
    },
    StopSeed {
        id: "pdh",
        label: "Clemente ↔ PDH",
        x: 520.0,
        y: 420.0,
        lat: 28.0634,
        lng: -80.6242,
        columns: &["PDH", "PDH (2)"],
    },
    StopSeed {
        id: "cob",
        label: "Nathan Bisk COB",
        x: 160.0,
        y: 110.0,
        lat: 28.0651,
        lng: -80.6262,
        columns: &["COB", "COB (2)"],
    },
    StopSeed {
        id: "bridge",
        label: "South Covered Bridge",
        x: 150.0,
        y: 470.0,
        lat: 28.0629,
        lng: -80.6268,
        columns: &["Covered Bridge"],
    },
];

/// The campus loop polyline.
pub fn campus_route() -> Vec<RoutePoint> {
    CAMPUS_ROUTE
        .iter()
        .map(|&(x, y)| RoutePoint::new(x, y))
        .collect()
}

/// The campus stops, in display order.
pub fn campus_stops() -> Vec<Stop> {
    CAMPUS_STOPS
        .iter()
        .filter_map(|seed| {
            // Seeds are compile-time constants; a bad id is skipped rather than panicking.
            let id = StopId::parse(seed.id).ok()?;
            Some(Stop {
                id,
                label: seed.label.to_string(),
                point: RoutePoint::new(seed.x, seed.y),
                lat: Some(seed.lat),
                lng: Some(seed.lng),
                timetable_columns: seed.columns.iter().map(|c| c.to_string()).collect(),
            })
        })
        .collect()
}

/// Route polyline, its arc-length table and the stops projected onto it.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct RouteGeometry {
    points: Vec<RoutePoint>,
    table: ArcLengthTable,
    width: f64,
    height: f64,
    stops: Vec<StopOnPath>,
}

/// Serializable outline of the route for map rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutline<'a> {
    pub points: &'a [RoutePoint],
    pub width: f64,
    pub height: f64,
    pub total_length: f64,
}

impl RouteGeometry {
    /// Build the geometry for a route and project every stop onto it.
    pub fn new(points: Vec<RoutePoint>, stops: Vec<Stop>, width: f64, height: f64) -> Self {
        let table = ArcLengthTable::build(&points);
        let stops = stops
            .into_iter()
            .map(|stop| {
                let progress = project_point(&points, &table, stop.point);
                StopOnPath {
                    ratio_x: stop.point.x / width,
                    ratio_y: stop.point.y / height,
                    progress,
                    stop,
                }
            })
            .collect();

        Self {
            points,
            table,
            width,
            height,
            stops,
        }
    }

    /// The campus loop with its eight stops.
    pub fn campus() -> Arc<Self> {
        Arc::new(Self::new(
            campus_route(),
            campus_stops(),
            ROUTE_WIDTH,
            ROUTE_HEIGHT,
        ))
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn table(&self) -> &ArcLengthTable {
        &self.table
    }

    pub fn stops(&self) -> &[StopOnPath] {
        &self.stops
    }

    /// Look up a stop by id.
    pub fn stop(&self, id: &StopId) -> Option<&StopOnPath> {
        self.stops.iter().find(|s| &s.stop.id == id)
    }

    /// Plain stop configs, in display order.
    pub fn plain_stops(&self) -> Vec<Stop> {
        self.stops.iter().map(|s| s.stop.clone()).collect()
    }

    /// Drawing position for a progress value along the loop.
    pub fn position_at(&self, progress: f64) -> RoutePoint {
        point_at_progress(&self.points, &self.table, progress)
    }

    pub fn outline(&self) -> RouteOutline<'_> {
        RouteOutline {
            points: &self.points,
            width: self.width,
            height: self.height,
            total_length: self.table.total(),
        }
    }
}
