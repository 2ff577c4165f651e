//! Clock-time handling for printed timetables.
//!
//! Timetables print times as loose "H:MM" tokens, sometimes with an AM/PM
//! suffix and often without. This module turns those tokens into
//! minutes since midnight and formats relative and absolute times for
//! display.

use chrono::{DateTime, TimeZone, Timelike};

/// Minutes in a day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Minutes in half a day, added when a column rolls past noon.
const HALF_DAY_MINS: u32 = 12 * 60;

/// How far a time may step backwards within one column before we assume the
/// printed schedule has rolled past noon without saying so.
pub const ROLLOVER_TOLERANCE_MINS: u32 = 5;

/// Meridiem suffix on a time token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

/// Parse a timetable token into minutes since midnight.
///
/// Accepts `H:MM`, `HH:MM`, and either followed by `AM`/`PM`
/// (case-insensitive, optionally separated by one space). Anything else
/// yields `None`; a missed token is normal for noisy tables and is not an
/// error.
///
/// `previous` is the last accepted value in the same column. For tokens
/// without a suffix, a value more than [`ROLLOVER_TOLERANCE_MINS`] earlier
/// than `previous` is moved 12 hours later: printed schedules go from
/// "12:45" to "1:02" at noon.
///
/// # Examples
///
/// ```
/// use shuttle_server::domain::parse_time_token;
///
/// assert_eq!(parse_time_token("9:18", None), Some(558));
/// assert_eq!(parse_time_token("12:30 AM", None), Some(30));
/// assert_eq!(parse_time_token("1:02 pm", None), Some(782));
///
/// // "1:02" after "12:46" in the same column is in the afternoon.
/// assert_eq!(parse_time_token("1:02", Some(766)), Some(782));
///
/// assert_eq!(parse_time_token("Driver Meal Break", None), None);
/// assert_eq!(parse_time_token("", None), None);
/// ```
pub fn parse_time_token(token: &str, previous: Option<u32>) -> Option<u32> {
    let token = token.trim();
    let (clock, meridiem) = split_meridiem(token)?;
    let (hour, minute) = parse_clock(clock)?;

    if minute > 59 {
        return None;
    }

    match meridiem {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match (m, hour) {
                (Meridiem::Am, 12) => 0,
                (Meridiem::Pm, h) if h < 12 => h + 12,
                (_, h) => h,
            };
            Some(hour * 60 + minute)
        }
        None => {
            if hour > 23 {
                return None;
            }
            let minutes = hour * 60 + minute;
            match previous {
                Some(prev) if minutes + ROLLOVER_TOLERANCE_MINS < prev => {
                    Some(minutes + HALF_DAY_MINS)
                }
                _ => Some(minutes),
            }
        }
    }
}

/// Split an optional trailing AM/PM off a trimmed token.
fn split_meridiem(token: &str) -> Option<(&str, Option<Meridiem>)> {
    if token.len() < 2 {
        return Some((token, None));
    }
    let (head, tail) = match (
        token.get(..token.len() - 2),
        token.get(token.len() - 2..),
    ) {
        (Some(head), Some(tail)) => (head, tail),
        _ => return Some((token, None)),
    };

    let meridiem = if tail.eq_ignore_ascii_case("am") {
        Meridiem::Am
    } else if tail.eq_ignore_ascii_case("pm") {
        Meridiem::Pm
    } else {
        return Some((token, None));
    };

    // At most one whitespace character between the clock and the suffix.
    let head = match head.chars().last() {
        Some(c) if c.is_whitespace() => &head[..head.len() - c.len_utf8()],
        _ => head,
    };
    Some((head, Some(meridiem)))
}

/// Parse `H:MM` or `HH:MM` into (hour, minute).
fn parse_clock(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    let hour = match h.as_bytes() {
        [d] => digit(*d)?,
        [d1, d2] => digit(*d1)? * 10 + digit(*d2)?,
        _ => return None,
    };
    let minute = match m.as_bytes() {
        [d1, d2] => digit(*d1)? * 10 + digit(*d2)?,
        _ => return None,
    };
    Some((hour, minute))
}

fn digit(b: u8) -> Option<u32> {
    (b as char).to_digit(10)
}

/// Format minutes since midnight as a 12-hour label, e.g. `"1:08 PM"`.
///
/// Values outside one day wrap around.
pub fn format_hm(minutes: u32) -> String {
    let m = minutes % MINUTES_PER_DAY;
    let h = m / 60;
    let min = m % 60;
    let ampm = if h >= 12 { "PM" } else { "AM" };
    let h12 = if h % 12 == 0 { 12 } else { h % 12 };
    format!("{h12}:{min:02} {ampm}")
}

/// Minutes since local midnight for a clock reading, with seconds as a fraction.
pub fn minutes_of_day<Tz: TimeZone>(clock: &DateTime<Tz>) -> f64 {
    clock.time().num_seconds_from_midnight() as f64 / 60.0
}

/// Minutes from `now` until `target`, rolling times already past to tomorrow.
///
/// Both arguments are minutes since midnight; the result is in `[0, 1440)`.
pub fn minutes_until(target: f64, now: f64) -> f64 {
    let day = MINUTES_PER_DAY as f64;
    let diff = (target - now).rem_euclid(day);
    // Tiny negative differences round up to a full day.
    if diff >= day { 0.0 } else { diff }
}

/// Human label for a countdown, e.g. `"in 5m"`.
///
/// # Examples
///
/// ```
/// use shuttle_server::domain::format_relative_minutes;
///
/// assert_eq!(format_relative_minutes(None), "—");
/// assert_eq!(format_relative_minutes(Some(0.3)), "arriving");
/// assert_eq!(format_relative_minutes(Some(1.2)), "in 1m");
/// assert_eq!(format_relative_minutes(Some(4.6)), "in 5m");
/// ```
pub fn format_relative_minutes(minutes: Option<f64>) -> String {
    match minutes {
        None => "—".to_string(),
        Some(m) if m < 0.5 => "arriving".to_string(),
        Some(m) if m < 1.5 => "in 1m".to_string(),
        Some(m) => format!("in {}m", m.round() as i64),
    }
}

/// Wall-clock label (`HH:MM:SS`) for an instant, or `"—"` when unknown.
pub fn format_clock<Tz>(instant: Option<&DateTime<Tz>>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match instant {
        Some(t) => t.format("%H:%M:%S").to_string(),
        None => "—".to_string(),
    }
}
