//! Deterministic trip-to-driver assignment engine.
//!
//! Single pass over the trips in input order. Each trip goes to the best
//! driver available on its effective day who has no trip within the minimum
//! separation, ranked by priority, then current workload, then name.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::calendar::{effective_day, parse_hhmm, trip_timestamp, weekday_name};
use crate::error::ConfigError;
use crate::result::{summary_line, Assignment, AssignmentResult, AssignmentStats, DriverLoad};
use crate::traits::{CommittedAssignment, Driver, Trip};

const HOURS_PER_WEEK: u32 = 7 * 24;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssignOptions {
    /// Minimum wall-clock gap, in hours, between two trips of one driver.
    pub min_hours_between_trips: u32,
    /// Trips before this hour are staffed from the previous day.
    pub night_shift_cutoff_hour: u32,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            min_hours_between_trips: 3,
            night_shift_cutoff_hour: 5,
        }
    }
}

impl AssignOptions {
    /// Load options from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.night_shift_cutoff_hour > 23 {
            return Err(ConfigError::InvalidCutoffHour(self.night_shift_cutoff_hour));
        }
        if self.min_hours_between_trips > HOURS_PER_WEEK {
            return Err(ConfigError::SeparationTooLarge(self.min_hours_between_trips));
        }
        Ok(())
    }

    pub fn min_separation(&self) -> Duration {
        Duration::hours(i64::from(self.min_hours_between_trips))
    }
}

/// Where and when a trip lands for scheduling purposes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TripSlot {
    pub timestamp: NaiveDateTime,
    pub calendar_day: u8,
    pub effective_day: u8,
}

impl TripSlot {
    pub fn of<T: Trip>(trip: &T, options: &AssignOptions) -> Self {
        let time = trip.planned_arrival_time();
        Self {
            timestamp: trip_timestamp(trip.trip_date(), time),
            calendar_day: trip.day_of_week(),
            effective_day: effective_day(trip.day_of_week(), time, options.night_shift_cutoff_hour),
        }
    }

    pub fn is_night_shift(&self) -> bool {
        self.effective_day != self.calendar_day
    }
}

/// Per-run driver state: workload and committed timestamps, indexed by the
/// driver's position in the input slice.
pub(crate) struct Roster<'a, D: Driver> {
    drivers: &'a [D],
    positions: HashMap<&'a D::Id, usize>,
    workload: Vec<usize>,
    timestamps: Vec<Vec<NaiveDateTime>>,
    separation: Duration,
}

impl<'a, D: Driver> Roster<'a, D> {
    pub fn new<C>(drivers: &'a [D], committed: &[C], options: &AssignOptions) -> Self
    where
        C: CommittedAssignment<DriverId = D::Id>,
    {
        let mut positions = HashMap::with_capacity(drivers.len());
        for (idx, driver) in drivers.iter().enumerate() {
            positions.entry(driver.id()).or_insert(idx);
        }

        let mut roster = Self {
            drivers,
            positions,
            workload: vec![0; drivers.len()],
            timestamps: vec![Vec::new(); drivers.len()],
            separation: options.min_separation(),
        };

        for assignment in committed {
            match roster.position(assignment.driver_id()) {
                Some(idx) => {
                    let ts = trip_timestamp(assignment.trip_date(), assignment.planned_arrival_time());
                    roster.record(idx, ts);
                }
                None => debug!("ignoring committed assignment for unknown driver"),
            }
        }

        roster
    }

    pub fn driver(&self, idx: usize) -> &'a D {
        &self.drivers[idx]
    }

    pub fn position(&self, id: &D::Id) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// True when the driver already holds a trip strictly closer than the separation.
    pub fn has_conflict(&self, idx: usize, timestamp: NaiveDateTime) -> bool {
        self.timestamps[idx].iter().any(|&existing| {
            let gap = if existing > timestamp {
                existing - timestamp
            } else {
                timestamp - existing
            };
            gap < self.separation
        })
    }

    pub fn record(&mut self, idx: usize, timestamp: NaiveDateTime) {
        self.timestamps[idx].push(timestamp);
        self.workload[idx] += 1;
    }

    /// Ranking between two candidates: priority, then workload, then name.
    fn rank(&self, a: usize, b: usize) -> Ordering {
        let (da, db) = (&self.drivers[a], &self.drivers[b]);
        da.effective_priority()
            .cmp(&db.effective_priority())
            .then_with(|| self.workload[a].cmp(&self.workload[b]))
            .then_with(|| da.name().cmp(db.name()))
    }

    /// Drivers with nonzero workload, busiest first. Ties keep input order.
    pub fn distribution(&self) -> Vec<DriverLoad<D::Id>> {
        let mut loads: Vec<DriverLoad<D::Id>> = self
            .drivers
            .iter()
            .zip(&self.workload)
            .filter(|(_, count)| **count > 0)
            .map(|(driver, count)| DriverLoad {
                driver_id: driver.id().clone(),
                driver_name: driver.name().to_string(),
                trip_count: *count,
            })
            .collect();
        loads.sort_by(|a, b| b.trip_count.cmp(&a.trip_count));
        loads
    }

    pub fn finish<TripId>(
        &self,
        assignments: Vec<Assignment<TripId, D::Id>>,
        warnings: Vec<String>,
        total_trips: usize,
    ) -> AssignmentResult<TripId, D::Id> {
        let assigned_count = assignments.len();
        AssignmentResult {
            summary: summary_line(assigned_count, total_trips),
            distribution: self.distribution(),
            stats: AssignmentStats {
                total_trips,
                assigned_count,
                unassigned_count: total_trips - assigned_count,
            },
            assignments,
            warnings,
        }
    }
}

/// Drivers available on each day of week, sorted by priority then name.
fn day_index<D: Driver>(drivers: &[D]) -> [Vec<usize>; 7] {
    std::array::from_fn(|day| {
        let mut available: Vec<usize> = (0..drivers.len())
            .filter(|&idx| drivers[idx].available_on(day as u8))
            .collect();
        available.sort_by(|&a, &b| {
            drivers[a]
                .effective_priority()
                .cmp(&drivers[b].effective_priority())
                .then_with(|| drivers[a].name().cmp(drivers[b].name()))
        });
        available
    })
}

pub(crate) fn priority_label(priority: i32) -> &'static str {
    match priority {
        1 => "high",
        3 => "low",
        _ => "med",
    }
}

pub(crate) fn reasoning<D: Driver>(slot: &TripSlot, driver: &D) -> String {
    let day = if slot.is_night_shift() {
        format!(
            "{} night ({} early hours)",
            weekday_name(slot.effective_day),
            weekday_name(slot.calendar_day)
        )
    } else {
        weekday_name(slot.effective_day).to_string()
    };
    format!(
        "{}: {} ({} priority)",
        day,
        driver.name(),
        priority_label(driver.effective_priority())
    )
}

fn no_driver_warning(label: &str, slot: &TripSlot) -> String {
    if slot.is_night_shift() {
        format!(
            "Trip {}: no driver available on {} (night shift for {})",
            label,
            weekday_name(slot.effective_day),
            weekday_name(slot.calendar_day)
        )
    } else {
        format!(
            "Trip {}: no driver available on {}",
            label,
            weekday_name(slot.effective_day)
        )
    }
}

fn conflict_warning<T: Trip>(trip: &T, slot: &TripSlot) -> String {
    let time = trip
        .planned_arrival_time()
        .filter(|t| parse_hhmm(t).is_some())
        .unwrap_or("unknown time");
    format!(
        "Trip {}: all {} drivers have conflicting trips near {} on {}",
        trip.label(),
        weekday_name(slot.effective_day),
        time,
        trip.trip_date().format("%Y-%m-%d")
    )
}

/// Assign trips to drivers.
///
/// `committed` seeds each driver's workload and conflict timestamps before any
/// trip is considered. Never fails: trips that cannot be placed produce one
/// warning each.
pub fn assign_trips<T, D, C>(
    trips: &[T],
    drivers: &[D],
    committed: &[C],
    options: &AssignOptions,
) -> AssignmentResult<T::Id, D::Id>
where
    T: Trip,
    D: Driver,
    C: CommittedAssignment<DriverId = D::Id>,
{
    let _span = tracing::debug_span!("assign_trips", trips = trips.len(), drivers = drivers.len())
        .entered();

    if trips.is_empty() {
        return AssignmentResult::empty();
    }
    if drivers.is_empty() {
        info!(trips = trips.len(), "no active drivers");
        return AssignmentResult::no_drivers(trips.len());
    }

    let mut roster = Roster::new(drivers, committed, options);
    let by_day = day_index(drivers);

    let mut assignments = Vec::new();
    let mut warnings = Vec::new();

    for trip in trips {
        let slot = TripSlot::of(trip, options);
        let day_list: &[usize] = by_day
            .get(slot.effective_day as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let chosen = day_list
            .iter()
            .copied()
            .filter(|&idx| !roster.has_conflict(idx, slot.timestamp))
            .min_by(|&a, &b| roster.rank(a, b));

        let Some(idx) = chosen else {
            let warning = if day_list.is_empty() {
                no_driver_warning(trip.label(), &slot)
            } else {
                conflict_warning(trip, &slot)
            };
            debug!(trip = trip.label(), %warning, "trip left unassigned");
            warnings.push(warning);
            continue;
        };

        let driver = roster.driver(idx);
        debug!(
            trip = trip.label(),
            driver = driver.name(),
            night_shift = slot.is_night_shift(),
            "trip assigned"
        );
        assignments.push(Assignment {
            trip_id: trip.id().clone(),
            driver_id: driver.id().clone(),
            reasoning: reasoning(&slot, driver),
        });
        roster.record(idx, slot.timestamp);
    }

    let result = roster.finish(assignments, warnings, trips.len());
    info!(
        assigned = result.stats.assigned_count,
        unassigned = result.stats.unassigned_count,
        "{}",
        result.summary
    );
    result
}

/// An independent input snapshot for [`assign_partitions`].
#[derive(Debug, Clone)]
pub struct Partition<T, D, C> {
    pub trips: Vec<T>,
    pub drivers: Vec<D>,
    pub committed: Vec<C>,
}

/// Run [`assign_trips`] over disjoint snapshots in parallel.
///
/// Each partition gets its own fresh driver state; nothing is shared between
/// them. Results come back in partition order.
pub fn assign_partitions<T, D, C>(
    partitions: &[Partition<T, D, C>],
    options: &AssignOptions,
) -> Vec<AssignmentResult<T::Id, D::Id>>
where
    T: Trip + Sync,
    D: Driver + Sync,
    C: CommittedAssignment<DriverId = D::Id> + Sync,
    T::Id: Send,
    D::Id: Send + Sync,
{
    partitions
        .par_iter()
        .map(|partition| {
            assign_trips(&partition.trips, &partition.drivers, &partition.committed, options)
        })
        .collect()
}
