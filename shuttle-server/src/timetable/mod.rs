//! Timetable parsing.
//!
//! Turns loosely formatted schedule text into structured per-stop time
//! series. Parsing is pure: the per-column rollover state is threaded
//! through the parse loop explicitly rather than held anywhere global.

mod grid;
mod series;

pub use grid::{TimetableGrid, TimetableRow, dedupe_header, next_times_by_stop, parse_grid, split_cells};
pub use series::{ScheduleEntry, ScheduleSeries, parse_schedule_series};
