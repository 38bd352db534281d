//! Plain records implementing the dispatch traits.
//!
//! These are what repositories hand out and what callers deserialize from
//! their own storage or API payloads.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::traits::{CommittedAssignment, Driver, Trip};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub id: String,
    pub trip_id: String,
    pub trip_date: NaiveDate,
    pub day_of_week: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_arrival_time: Option<String>,
    /// Cancelled trips stay in storage but are never offered for assignment.
    #[serde(default)]
    pub cancelled: bool,
}

impl TripRecord {
    /// Builds a record whose `day_of_week` is derived from `trip_date`.
    pub fn new(
        id: impl Into<String>,
        trip_id: impl Into<String>,
        trip_date: NaiveDate,
        planned_arrival_time: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            trip_id: trip_id.into(),
            trip_date,
            day_of_week: trip_date.weekday().num_days_from_sunday() as u8,
            planned_arrival_time: planned_arrival_time.map(str::to_string),
            cancelled: false,
        }
    }

    pub fn cancel(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

impl Trip for TripRecord {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn label(&self) -> &str {
        &self.trip_id
    }

    fn trip_date(&self) -> NaiveDate {
        self.trip_date
    }

    fn day_of_week(&self) -> u8 {
        self.day_of_week
    }

    fn planned_arrival_time(&self) -> Option<&str> {
        self.planned_arrival_time.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub priority: Option<i32>,
    /// Days of week (0 = Sunday) the driver works.
    #[serde(default)]
    pub availability: BTreeSet<u8>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl DriverRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: None,
            availability: BTreeSet::new(),
            active: true,
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn available(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.availability.extend(days);
        self
    }
}

impl Driver for DriverRecord {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Option<i32> {
        self.priority
    }

    fn available_on(&self, day_of_week: u8) -> bool {
        self.availability.contains(&day_of_week)
    }
}

/// A confirmed assignment already held by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedRecord {
    /// Trip the assignment belongs to. Not needed by the engine, kept so
    /// stores can tell assigned trips apart.
    pub trip_id: String,
    pub driver_id: String,
    pub trip_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_arrival_time: Option<String>,
}

impl CommittedAssignment for CommittedRecord {
    type DriverId = String;

    fn driver_id(&self) -> &Self::DriverId {
        &self.driver_id
    }

    fn trip_date(&self) -> NaiveDate {
        self.trip_date
    }

    fn planned_arrival_time(&self) -> Option<&str> {
        self.planned_arrival_time.as_deref()
    }
}
