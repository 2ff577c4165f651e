//! Per-stop arrival lists.
//!
//! Given the current mode, the live feed and the parsed schedule, produce
//! for every stop the upcoming arrivals in minutes from `clock`, soonest
//! first. A stop with no live ETAs falls back to its own schedule even in
//! live mode, so one quiet stop never blanks the board.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::domain::{StopId, minutes_of_day, minutes_until};
use crate::feeds::LiveFeed;
use crate::timetable::ScheduleSeries;

use super::freshness::DataMode;

/// Upcoming arrivals at one stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEntry {
    pub source: DataMode,
    pub source_label: &'static str,

    /// Minutes from now, ascending, never negative.
    pub times: Vec<f64>,

    /// Printed clock labels matching `times`; schedule entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl ArrivalEntry {
    /// An entry with no arrivals, tagged with the mode it was computed in.
    pub fn empty(mode: DataMode) -> Self {
        Self {
            source: mode,
            source_label: mode.label(),
            times: Vec::new(),
            labels: None,
        }
    }

    /// Minutes until the soonest arrival.
    pub fn next(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Inputs to [`compute_arrivals`] besides the clock.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalInputs<'a> {
    pub mode: DataMode,
    pub live: Option<&'a LiveFeed>,
    /// When `live` was fetched; ETAs are decayed from this instant.
    pub live_fetched_at: Option<DateTime<Utc>>,
    pub schedule: Option<&'a ScheduleSeries>,
}

fn live_entry(feed: &LiveFeed, stop: &StopId, elapsed_mins: f64) -> Option<ArrivalEntry> {
    let mut times: Vec<f64> = feed
        .etas_for(stop)
        .iter()
        .filter_map(|eta| eta.eta_minutes)
        .map(|eta| (eta - elapsed_mins).max(0.0))
        .collect();
    if times.is_empty() {
        return None;
    }
    times.sort_by(f64::total_cmp);
    Some(ArrivalEntry {
        source: DataMode::Live,
        source_label: DataMode::Live.label(),
        times,
        labels: None,
    })
}

fn schedule_entry(series: &ScheduleSeries, stop: &StopId, now_mins: f64) -> Option<ArrivalEntry> {
    let mut upcoming: Vec<(f64, &str)> = series
        .get(stop)
        .iter()
        .map(|entry| (minutes_until(entry.minutes as f64, now_mins), entry.label.as_str()))
        .collect();
    if upcoming.is_empty() {
        return None;
    }
    upcoming.sort_by(|a, b| a.0.total_cmp(&b.0));
    Some(ArrivalEntry {
        source: DataMode::Schedule,
        source_label: DataMode::Schedule.label(),
        times: upcoming.iter().map(|(eta, _)| *eta).collect(),
        labels: Some(upcoming.iter().map(|(_, label)| label.to_string()).collect()),
    })
}

/// Build the arrival board for `stops` at `clock`.
///
/// Schedule times are read in `clock`'s own time zone, so pass local time
/// to match a printed timetable.
pub fn compute_arrivals<'s, Tz: TimeZone>(
    stops: impl IntoIterator<Item = &'s StopId>,
    inputs: &ArrivalInputs<'_>,
    clock: &DateTime<Tz>,
) -> BTreeMap<StopId, ArrivalEntry> {
    let now_mins = minutes_of_day(clock);
    let elapsed_mins = inputs
        .live_fetched_at
        .map(|at| (clock.timestamp_millis() - at.timestamp_millis()) as f64 / 60_000.0)
        .unwrap_or(0.0);

    stops
        .into_iter()
        .map(|stop| {
            let live = match (inputs.mode, inputs.live) {
                (DataMode::Live, Some(feed)) => live_entry(feed, stop, elapsed_mins),
                _ => None,
            };
            let entry = live
                .or_else(|| inputs.schedule.and_then(|s| schedule_entry(s, stop, now_mins)))
                .unwrap_or_else(|| ArrivalEntry::empty(inputs.mode));
            (stop.clone(), entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{LiveEta, SchedulePayload};
    use chrono::Duration;

    fn id(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn eta(minutes: Option<f64>) -> LiveEta {
        LiveEta {
            vehicle_id: None,
            eta_minutes: minutes,
        }
    }

    fn live_feed(stop: &str, etas: Vec<LiveEta>) -> LiveFeed {
        let mut feed = LiveFeed::default();
        feed.etas.insert(stop.into(), etas);
        feed
    }

    fn schedule(stop: &str, labels: &[&str]) -> ScheduleSeries {
        let mut payload = SchedulePayload::default();
        payload
            .stops
            .insert(stop.into(), labels.iter().map(|s| s.to_string()).collect());
        ScheduleSeries::from_payload(&payload)
    }

    #[test]
    fn live_etas_decay_and_sort() {
        let feed = live_feed("commons", vec![eta(Some(9.0)), eta(Some(4.0)), eta(None)]);
        let stops = [id("commons")];
        let inputs = ArrivalInputs {
            mode: DataMode::Live,
            live: Some(&feed),
            live_fetched_at: Some(noon() - Duration::minutes(2)),
            schedule: None,
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        let entry = &board[&id("commons")];
        assert_eq!(entry.source, DataMode::Live);
        assert_eq!(entry.source_label, "Live ETA");
        assert_eq!(entry.times, vec![2.0, 7.0]);
        assert!(entry.labels.is_none());
    }

    #[test]
    fn live_eta_floors_at_zero() {
        // Fetched six minutes ago with a four-minute ETA.
        let feed = live_feed("commons", vec![eta(Some(4.0))]);
        let stops = [id("commons")];
        let inputs = ArrivalInputs {
            mode: DataMode::Live,
            live: Some(&feed),
            live_fetched_at: Some(noon() - Duration::minutes(6)),
            schedule: None,
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        assert_eq!(board[&id("commons")].times, vec![0.0]);
    }

    #[test]
    fn unknown_fetch_time_means_no_decay() {
        let feed = live_feed("commons", vec![eta(Some(4.0))]);
        let stops = [id("commons")];
        let inputs = ArrivalInputs {
            mode: DataMode::Live,
            live: Some(&feed),
            live_fetched_at: None,
            schedule: None,
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        assert_eq!(board[&id("commons")].times, vec![4.0]);
    }

    #[test]
    fn schedule_mode_uses_clock_distance() {
        let series = schedule("olin", &["11:45", "12:30"]);
        let stops = [id("olin")];
        let inputs = ArrivalInputs {
            mode: DataMode::Schedule,
            live: None,
            live_fetched_at: None,
            schedule: Some(&series),
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        let entry = &board[&id("olin")];
        assert_eq!(entry.source, DataMode::Schedule);
        assert_eq!(entry.source_label, "Schedule estimate");
        // 11:45 has passed, so it is tomorrow's.
        assert_eq!(entry.times, vec![30.0, 1425.0]);
        assert_eq!(
            entry.labels.as_deref(),
            Some(&["12:30".to_string(), "11:45".to_string()][..])
        );
    }

    #[test]
    fn schedule_counts_seconds() {
        let series = schedule("olin", &["12:01"]);
        let stops = [id("olin")];
        let inputs = ArrivalInputs {
            mode: DataMode::Schedule,
            live: None,
            live_fetched_at: None,
            schedule: Some(&series),
        };
        let clock = noon() + Duration::seconds(30);
        let board = compute_arrivals(&stops, &inputs, &clock);
        assert!((board[&id("olin")].times[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn schedule_mode_ignores_live_data() {
        let feed = live_feed("olin", vec![eta(Some(1.0))]);
        let series = schedule("olin", &["12:30"]);
        let stops = [id("olin")];
        let inputs = ArrivalInputs {
            mode: DataMode::Schedule,
            live: Some(&feed),
            live_fetched_at: Some(noon()),
            schedule: Some(&series),
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        assert_eq!(board[&id("olin")].source, DataMode::Schedule);
    }

    #[test]
    fn live_mode_falls_back_per_stop() {
        let feed = live_feed("commons", vec![eta(Some(3.0))]);
        let series = schedule("olin", &["12:10"]);
        let stops = [id("commons"), id("olin")];
        let inputs = ArrivalInputs {
            mode: DataMode::Live,
            live: Some(&feed),
            live_fetched_at: Some(noon()),
            schedule: Some(&series),
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        assert_eq!(board[&id("commons")].source, DataMode::Live);
        assert_eq!(board[&id("olin")].source, DataMode::Schedule);
        assert_eq!(board[&id("olin")].times, vec![10.0]);
    }

    #[test]
    fn only_junk_etas_falls_back() {
        let feed = live_feed("olin", vec![eta(None), eta(None)]);
        let series = schedule("olin", &["12:10"]);
        let stops = [id("olin")];
        let inputs = ArrivalInputs {
            mode: DataMode::Live,
            live: Some(&feed),
            live_fetched_at: Some(noon()),
            schedule: Some(&series),
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        assert_eq!(board[&id("olin")].source, DataMode::Schedule);
    }

    #[test]
    fn nothing_known_is_empty_and_tagged() {
        let stops = [id("bridge")];
        for mode in [DataMode::Live, DataMode::Schedule] {
            let inputs = ArrivalInputs {
                mode,
                live: None,
                live_fetched_at: None,
                schedule: None,
            };
            let board = compute_arrivals(&stops, &inputs, &noon());
            let entry = &board[&id("bridge")];
            assert!(entry.is_empty());
            assert_eq!(entry.source, mode);
            assert_eq!(entry.next(), None);
        }
    }

    #[test]
    fn every_stop_gets_an_entry() {
        let stops = [id("a"), id("b"), id("c")];
        let inputs = ArrivalInputs {
            mode: DataMode::Schedule,
            live: None,
            live_fetched_at: None,
            schedule: None,
        };
        let board = compute_arrivals(&stops, &inputs, &noon());
        assert_eq!(board.len(), 3);
    }

    #[test]
    fn serializes_camel_case() {
        let entry = ArrivalEntry::empty(DataMode::Live);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["source"], "live");
        assert_eq!(json["sourceLabel"], "Live ETA");
        assert!(json.get("labels").is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::feeds::LiveEta;
    use chrono::Duration;
    use proptest::prelude::*;

    proptest! {
        /// Live times are sorted and never negative, whatever the decay.
        #[test]
        fn live_times_sorted_non_negative(
            etas in prop::collection::vec(-10.0f64..120.0, 1..10),
            elapsed_secs in 0i64..3600,
        ) {
            let mut feed = LiveFeed::default();
            feed.etas.insert(
                "commons".into(),
                etas.iter().map(|&m| LiveEta { vehicle_id: None, eta_minutes: Some(m) }).collect(),
            );
            let clock = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
            let stops = [StopId::parse("commons").unwrap()];
            let inputs = ArrivalInputs {
                mode: DataMode::Live,
                live: Some(&feed),
                live_fetched_at: Some(clock - Duration::seconds(elapsed_secs)),
                schedule: None,
            };
            let board = compute_arrivals(&stops, &inputs, &clock);
            let times = &board[&stops[0]].times;
            prop_assert_eq!(times.len(), etas.len());
            prop_assert!(times.iter().all(|&t| t >= 0.0));
            prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
        }

        /// Schedule times stay within one day and keep labels aligned.
        #[test]
        fn schedule_times_within_a_day(
            minutes in prop::collection::vec(0u32..1440, 1..20),
            clock_secs in 0u32..86_400,
        ) {
            let labels: Vec<String> = minutes
                .iter()
                .map(|m| format!("{}:{:02}", m / 60, m % 60))
                .collect();
            let mut payload = crate::feeds::SchedulePayload::default();
            payload.stops.insert("olin".into(), labels);
            let series = ScheduleSeries::from_payload(&payload);

            let clock = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
                + Duration::seconds(clock_secs as i64);
            let stops = [StopId::parse("olin").unwrap()];
            let inputs = ArrivalInputs {
                mode: DataMode::Schedule,
                live: None,
                live_fetched_at: None,
                schedule: Some(&series),
            };
            let board = compute_arrivals(&stops, &inputs, &clock);
            let entry = &board[&stops[0]];
            prop_assert!(entry.times.iter().all(|&t| (0.0..1440.0).contains(&t)));
            prop_assert!(entry.times.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(entry.labels.as_ref().map(Vec::len), Some(entry.times.len()));
        }
    }
}
