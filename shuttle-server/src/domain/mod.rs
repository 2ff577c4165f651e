//! Domain types for the shuttle tracker.
//!
//! This module contains the static route model (polyline, stops, vehicles)
//! and the clock-time helpers used by the timetable parser. Types enforce
//! their invariants at construction time, and every geometry query is a
//! pure function that tolerates degenerate input.

mod error;
mod geometry;
mod route;
mod service;
mod stop;
mod time;
mod vehicle;

pub use error::DomainError;
pub use geometry::{ArcLengthTable, RoutePoint, point_at_progress, project_point, wrap_progress};
pub use route::{
    ROUTE_HEIGHT, ROUTE_WIDTH, RouteGeometry, RouteOutline, campus_route, campus_stops,
};
pub use service::{InvalidServiceState, ServiceState};
pub use stop::{InvalidStopId, Stop, StopId, StopOnPath, haversine_km, nearest_stop};
pub use time::{
    MINUTES_PER_DAY, ROLLOVER_TOLERANCE_MINS, format_clock, format_hm, format_relative_minutes,
    minutes_of_day, minutes_until, parse_time_token,
};
pub use vehicle::{LOOP_DURATION_MINS, Vehicle, VehiclePosition, place_vehicles, vehicle_progress};

pub(crate) use vehicle::lenient_f64;
