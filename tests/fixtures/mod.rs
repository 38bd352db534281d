//! Test fixtures for trip-dispatch.
//!
//! Builders for trips, drivers and committed assignments around a fixed week
//! in January 2026 (2026-01-11 is a Sunday).

#![allow(dead_code)]

use chrono::NaiveDate;

use trip_dispatch::model::{CommittedRecord, DriverRecord, TripRecord};
use trip_dispatch::result::AssignmentResult;

pub const SUNDAY: u8 = 0;
pub const MONDAY: u8 = 1;
pub const TUESDAY: u8 = 2;
pub const WEDNESDAY: u8 = 3;
pub const THURSDAY: u8 = 4;
pub const FRIDAY: u8 = 5;
pub const SATURDAY: u8 = 6;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// 2026-01-14, a Wednesday.
pub fn wednesday() -> NaiveDate {
    date(2026, 1, 14)
}

pub fn trip(id: &str, on: NaiveDate, time: Option<&str>) -> TripRecord {
    TripRecord::new(id, format!("T-{}", id), on, time)
}

pub fn driver(id: &str, name: &str, days: &[u8]) -> DriverRecord {
    DriverRecord::new(id, name).available(days.iter().copied())
}

pub fn committed(driver_id: &str, on: NaiveDate, time: Option<&str>) -> CommittedRecord {
    CommittedRecord {
        trip_id: format!("committed-{}-{}", driver_id, on),
        driver_id: driver_id.to_string(),
        trip_date: on,
        planned_arrival_time: time.map(str::to_string),
    }
}

pub fn no_committed() -> Vec<CommittedRecord> {
    Vec::new()
}

/// `(trip_id, driver_id)` pairs in output order.
pub fn pairs(result: &AssignmentResult<String, String>) -> Vec<(&str, &str)> {
    result
        .assignments
        .iter()
        .map(|a| (a.trip_id.as_str(), a.driver_id.as_str()))
        .collect()
}

/// Turn a run's output into committed rows for a follow-up run.
pub fn as_committed(
    result: &AssignmentResult<String, String>,
    trips: &[TripRecord],
) -> Vec<CommittedRecord> {
    result
        .assignments
        .iter()
        .filter_map(|a| {
            let trip = trips.iter().find(|t| t.id == a.trip_id)?;
            Some(CommittedRecord {
                trip_id: trip.id.clone(),
                driver_id: a.driver_id.clone(),
                trip_date: trip.trip_date,
                planned_arrival_time: trip.planned_arrival_time.clone(),
            })
        })
        .collect()
}
