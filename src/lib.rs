//! trip-dispatch
//!
//! Deterministic trip-to-driver assignment with night-shift rollover and
//! time-separation conflicts, plus an optional model-proposal path that is
//! validated against the same rules.

pub mod traits;
pub mod model;
pub mod calendar;
pub mod engine;
pub mod result;
pub mod proposal;
pub mod llm;
pub mod repository;
pub mod error;

pub use engine::{assign_partitions, assign_trips, AssignOptions, Partition};
pub use result::{Assignment, AssignmentResult, AssignmentStats, DriverLoad};
