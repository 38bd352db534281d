//! Day-of-week and time-of-day helpers.
//!
//! Timestamps are naive (no zone attached) so hour comparisons never pick up
//! local-time artifacts. Treat them as UTC.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// English name for a day of week (0 = Sunday). Out-of-range values give `"Unknown"`.
pub fn weekday_name(day_of_week: u8) -> &'static str {
    WEEKDAY_NAMES
        .get(day_of_week as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Parse a strict `HH:MM` 24-hour time. Anything else is `None`.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().all(|b| b.is_ascii_digit()) || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = hours.parse().ok()?;
    let minute: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Absolute timestamp of a trip: its date plus planned time, midnight when the
/// time is missing or malformed.
pub fn trip_timestamp(date: NaiveDate, planned_time: Option<&str>) -> NaiveDateTime {
    let time = planned_time
        .and_then(parse_hhmm)
        .unwrap_or(NaiveTime::MIN);
    date.and_time(time)
}

/// Day of week used for availability matching.
///
/// A valid time with an hour strictly before `cutoff_hour` belongs to the
/// previous day's night shift.
pub fn effective_day(day_of_week: u8, planned_time: Option<&str>, cutoff_hour: u32) -> u8 {
    let before_cutoff = planned_time
        .and_then(parse_hhmm)
        .is_some_and(|time| time.hour() < cutoff_hour);

    if before_cutoff && day_of_week < 7 {
        (day_of_week + 6) % 7
    } else {
        day_of_week
    }
}
