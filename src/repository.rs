//! Storage seams and the auto-assign service built on them.
//!
//! The engine never touches storage. `AutoAssigner` fetches a snapshot through
//! these traits, runs the engine and commits the result as one batch.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::engine::{assign_trips, AssignOptions};
use crate::error::RepositoryError;
use crate::model::{CommittedRecord, DriverRecord, TripRecord};
use crate::result::{Assignment, AssignmentResult};

pub type RecordAssignment = Assignment<String, String>;

pub trait TripRepository {
    /// Trips that are not cancelled and have no committed assignment.
    fn unassigned_trips(&self) -> Result<Vec<TripRecord>, RepositoryError>;
}

pub trait DriverRepository {
    /// Drivers marked active, with their weekly availability.
    fn active_drivers(&self) -> Result<Vec<DriverRecord>, RepositoryError>;
}

pub trait AssignmentRepository {
    fn committed_assignments(&self) -> Result<Vec<CommittedRecord>, RepositoryError>;

    /// Commit every assignment or none of them.
    fn commit_batch(&self, assignments: &[RecordAssignment]) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
struct StoreState {
    trips: Vec<TripRecord>,
    drivers: Vec<DriverRecord>,
    committed: Vec<CommittedRecord>,
}

/// In-process store backing all three repositories.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new(trips: Vec<TripRecord>, drivers: Vec<DriverRecord>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                trips,
                drivers,
                committed: Vec::new(),
            }),
        }
    }

    pub fn with_committed(mut self, committed: Vec<CommittedRecord>) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .committed = committed;
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> Result<R, RepositoryError> {
        let mut state = self.state.lock().map_err(|_| RepositoryError::Poisoned)?;
        Ok(f(&mut state))
    }
}

impl TripRepository for InMemoryStore {
    fn unassigned_trips(&self) -> Result<Vec<TripRecord>, RepositoryError> {
        self.with_state(|state| {
            let assigned: HashSet<&str> =
                state.committed.iter().map(|c| c.trip_id.as_str()).collect();
            state
                .trips
                .iter()
                .filter(|trip| !trip.cancelled && !assigned.contains(trip.id.as_str()))
                .cloned()
                .collect()
        })
    }
}

impl DriverRepository for InMemoryStore {
    fn active_drivers(&self) -> Result<Vec<DriverRecord>, RepositoryError> {
        self.with_state(|state| {
            state
                .drivers
                .iter()
                .filter(|driver| driver.active)
                .cloned()
                .collect()
        })
    }
}

impl AssignmentRepository for InMemoryStore {
    fn committed_assignments(&self) -> Result<Vec<CommittedRecord>, RepositoryError> {
        self.with_state(|state| state.committed.clone())
    }

    fn commit_batch(&self, assignments: &[RecordAssignment]) -> Result<(), RepositoryError> {
        self.with_state(|state| -> Result<(), RepositoryError> {
            let mut taken: HashSet<&str> =
                state.committed.iter().map(|c| c.trip_id.as_str()).collect();
            let mut staged = Vec::with_capacity(assignments.len());

            for assignment in assignments {
                let trip = state
                    .trips
                    .iter()
                    .find(|trip| trip.id == assignment.trip_id)
                    .ok_or_else(|| RepositoryError::UnknownTrip(assignment.trip_id.clone()))?;
                if !state.drivers.iter().any(|d| d.id == assignment.driver_id) {
                    return Err(RepositoryError::UnknownDriver(assignment.driver_id.clone()));
                }
                if !taken.insert(trip.id.as_str()) {
                    return Err(RepositoryError::AlreadyAssigned(trip.id.clone()));
                }
                staged.push(CommittedRecord {
                    trip_id: trip.id.clone(),
                    driver_id: assignment.driver_id.clone(),
                    trip_date: trip.trip_date,
                    planned_arrival_time: trip.planned_arrival_time.clone(),
                });
            }

            state.committed.extend(staged);
            Ok(())
        })?
    }
}

/// Fetch, assign, commit.
pub struct AutoAssigner<'a, T: ?Sized, D: ?Sized, A: ?Sized> {
    pub trips: &'a T,
    pub drivers: &'a D,
    pub assignments: &'a A,
    pub options: AssignOptions,
}

impl<'a, T, D, A> AutoAssigner<'a, T, D, A>
where
    T: TripRepository + ?Sized,
    D: DriverRepository + ?Sized,
    A: AssignmentRepository + ?Sized,
{
    pub fn run(&self) -> Result<AssignmentResult<String, String>, RepositoryError> {
        let trips = self.trips.unassigned_trips()?;
        let drivers = self.drivers.active_drivers()?;
        let committed = self.assignments.committed_assignments()?;

        let result = assign_trips(&trips, &drivers, &committed, &self.options);
        if !result.assignments.is_empty() {
            self.assignments.commit_batch(&result.assignments)?;
        }

        info!(
            committed = result.stats.assigned_count,
            warnings = result.warnings.len(),
            "{}",
            result.summary
        );
        Ok(result)
    }
}
