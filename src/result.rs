//! Output shapes shared by the engine and the proposal path.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment<TripId, DriverId> {
    pub trip_id: TripId,
    pub driver_id: DriverId,
    pub reasoning: String,
}

/// How many trips a driver holds after the run, committed ones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLoad<DriverId> {
    pub driver_id: DriverId,
    pub driver_name: String,
    pub trip_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentStats {
    pub total_trips: usize,
    pub assigned_count: usize,
    pub unassigned_count: usize,
}

/// Result of one assignment run.
///
/// `summary` is display text; branch on `stats` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult<TripId, DriverId> {
    pub assignments: Vec<Assignment<TripId, DriverId>>,
    pub warnings: Vec<String>,
    pub summary: String,
    pub distribution: Vec<DriverLoad<DriverId>>,
    pub stats: AssignmentStats,
}

impl<TripId, DriverId> AssignmentResult<TripId, DriverId> {
    pub(crate) fn empty() -> Self {
        Self {
            assignments: Vec::new(),
            warnings: Vec::new(),
            summary: "No trips to assign".to_string(),
            distribution: Vec::new(),
            stats: AssignmentStats::default(),
        }
    }

    pub(crate) fn no_drivers(total_trips: usize) -> Self {
        Self {
            assignments: Vec::new(),
            warnings: vec!["No active drivers available".to_string()],
            summary: summary_line(0, total_trips),
            distribution: Vec::new(),
            stats: AssignmentStats {
                total_trips,
                assigned_count: 0,
                unassigned_count: total_trips,
            },
        }
    }

    pub fn is_complete(&self) -> bool {
        self.stats.unassigned_count == 0
    }
}

pub(crate) fn summary_line(assigned: usize, total: usize) -> String {
    format!("Assigned {} of {} trips", assigned, total)
}
