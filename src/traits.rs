//! Core domain traits for the dispatch engine.
//!
//! These are intentionally minimal. Concrete apps implement them for their own
//! records; `crate::model` provides plain serde-backed ones.

use std::hash::Hash;

use chrono::NaiveDate;

/// Unique identifier for dispatch entities.
pub trait Id: Clone + Eq + Hash {}

impl<T> Id for T where T: Clone + Eq + Hash {}

/// Priority used when a driver has none recorded.
pub const DEFAULT_PRIORITY: i32 = 2;

/// A trip waiting for a driver.
pub trait Trip {
    type Id: Id;

    /// Opaque identifier, used as the output key.
    fn id(&self) -> &Self::Id;

    /// Human-readable label, used only in messages.
    fn label(&self) -> &str;

    fn trip_date(&self) -> NaiveDate;

    /// Calendar day of week, 0 = Sunday .. 6 = Saturday.
    fn day_of_week(&self) -> u8;

    /// Planned arrival as `HH:MM` (24-hour), if known.
    fn planned_arrival_time(&self) -> Option<&str>;
}

/// A driver who can be assigned trips.
pub trait Driver {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    fn name(&self) -> &str;

    /// Lower is more important. `None` falls back to [`DEFAULT_PRIORITY`].
    fn priority(&self) -> Option<i32>;

    /// Whether the driver works on the given day of week (0 = Sunday).
    fn available_on(&self, day_of_week: u8) -> bool;

    fn effective_priority(&self) -> i32 {
        self.priority().unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Load already committed to a driver before this run.
pub trait CommittedAssignment {
    type DriverId: Id;

    fn driver_id(&self) -> &Self::DriverId;

    fn trip_date(&self) -> NaiveDate;

    fn planned_arrival_time(&self) -> Option<&str>;
}
