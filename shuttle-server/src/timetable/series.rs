//! Per-stop schedule series.
//!
//! The arrival aggregator works from one ascending list of scheduled times
//! per stop. Those lists come either from a schedule payload (per-stop
//! arrays of clock strings) or from a printed timetable grid.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Stop, StopId, format_hm, parse_time_token};
use crate::feeds::{ScheduleDocument, SchedulePayload};

use super::grid::{TimetableGrid, parse_grid};

/// A scheduled time at a stop, with the label to show for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub label: String,
    pub minutes: u32,
}

/// Parse one stop's clock strings, in printed order.
///
/// The whole list shares one rollover state, so a list running
/// "11:50", "12:20", "12:50", "1:20" ends in the afternoon. Unparseable
/// labels are dropped.
///
/// # Examples
///
/// ```
/// use shuttle_server::timetable::parse_schedule_series;
///
/// let series = parse_schedule_series(&["12:50", "n/a", "1:20"]);
/// let minutes: Vec<u32> = series.iter().map(|e| e.minutes).collect();
/// assert_eq!(minutes, vec![770, 800]);
/// ```
pub fn parse_schedule_series<S: AsRef<str>>(labels: &[S]) -> Vec<ScheduleEntry> {
    let mut previous = None;
    let mut entries = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.as_ref();
        if let Some(minutes) = parse_time_token(label, previous) {
            entries.push(ScheduleEntry {
                label: label.to_string(),
                minutes,
            });
            previous = Some(minutes);
        }
    }
    entries
}

/// Scheduled times for every stop, each list ascending by minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSeries {
    by_stop: BTreeMap<StopId, Vec<ScheduleEntry>>,
}

impl ScheduleSeries {
    /// Build from a schedule payload. Stops with invalid ids are skipped.
    pub fn from_payload(payload: &SchedulePayload) -> Self {
        let by_stop = payload
            .stops
            .iter()
            .filter_map(|(id, labels)| {
                let id = StopId::parse(id).ok()?;
                let mut entries = parse_schedule_series(labels);
                entries.sort_by_key(|e| e.minutes);
                Some((id, entries))
            })
            .collect();
        Self { by_stop }
    }

    /// Build from a printed timetable.
    ///
    /// Each stop collects every column listed in its `timetable_columns`;
    /// columns no stop claims are ignored. Labels are rendered with
    /// [`format_hm`].
    pub fn from_grid(grid: &TimetableGrid, stops: &[Stop]) -> Self {
        let mut by_stop = BTreeMap::new();
        for stop in stops {
            let columns: Vec<usize> = grid
                .header
                .iter()
                .enumerate()
                .filter(|(_, label)| stop.timetable_columns.iter().any(|c| c == *label))
                .map(|(i, _)| i)
                .collect();
            if columns.is_empty() {
                continue;
            }

            let mut entries: Vec<ScheduleEntry> = grid
                .rows
                .iter()
                .flat_map(|row| columns.iter().filter_map(move |&c| row.get(c).copied().flatten()))
                .map(|minutes| ScheduleEntry {
                    label: format_hm(minutes),
                    minutes,
                })
                .collect();
            entries.sort_by_key(|e| e.minutes);
            by_stop.insert(stop.id.clone(), entries);
        }
        Self { by_stop }
    }

    /// Build from whichever schedule form the feed served.
    pub fn from_document(doc: &ScheduleDocument, stops: &[Stop]) -> Self {
        match doc {
            ScheduleDocument::Payload(payload) => Self::from_payload(payload),
            ScheduleDocument::Timetable(text) => Self::from_grid(&parse_grid(text), stops),
        }
    }

    /// Scheduled entries for a stop, ascending. Empty if the stop is unknown.
    pub fn get(&self, stop: &StopId) -> &[ScheduleEntry] {
        self.by_stop.get(stop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_stop.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stop.is_empty()
    }

    pub fn stops(&self) -> impl Iterator<Item = &StopId> {
        self.by_stop.keys()
    }
}
