//! Language-model proposal path.
//!
//! A model is asked for assignments as JSON; whatever comes back is parsed
//! leniently and then re-checked against the same driver state the engine
//! uses, so a proposal can never introduce an unknown id, an unavailable
//! driver or a time conflict.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::calendar::{parse_hhmm, weekday_name};
use crate::engine::{assign_trips, reasoning, AssignOptions, Roster, TripSlot};
use crate::error::ProposalError;
use crate::result::{Assignment, AssignmentResult};
use crate::traits::{CommittedAssignment, Driver, Trip};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("Invalid fenced block regex")
});

/// Something that turns a prompt into free-text completion.
pub trait ProposalSource {
    fn complete(&self, prompt: &str) -> Result<String, ProposalError>;
}

/// One assignment as proposed by a model, ids not yet verified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAssignment {
    #[serde(alias = "trip_id")]
    pub trip_id: String,
    #[serde(alias = "driver_id")]
    pub driver_id: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProposalEnvelope {
    #[serde(default)]
    assignments: Vec<ProposedAssignment>,
}

/// Build the prompt describing drivers, trips, committed load and the rules.
pub fn build_prompt<T, D, C>(
    trips: &[T],
    drivers: &[D],
    committed: &[C],
    options: &AssignOptions,
) -> String
where
    T: Trip,
    T::Id: AsRef<str>,
    D: Driver,
    D::Id: AsRef<str>,
    C: CommittedAssignment<DriverId = D::Id>,
{
    let mut prompt = String::new();

    prompt.push_str("Assign each trip to exactly one driver.\n\nRules:\n");
    prompt.push_str("- A driver may only take trips on days they are available (see effective day).\n");
    prompt.push_str(&format!(
        "- Trips before {:02}:00 belong to the previous day's night shift.\n",
        options.night_shift_cutoff_hour
    ));
    prompt.push_str(&format!(
        "- Two trips of the same driver must be at least {} hours apart, including committed trips.\n",
        options.min_hours_between_trips
    ));
    prompt.push_str("- Prefer lower priority numbers (1 = high), then the driver with fewer trips.\n");
    prompt.push_str("- Leave a trip out if no driver fits.\n\nDrivers:\n");

    for driver in drivers {
        let days: Vec<&str> = (0..7u8)
            .filter(|&day| driver.available_on(day))
            .map(weekday_name)
            .collect();
        prompt.push_str(&format!(
            "- id={} name={} priority={} available={}\n",
            driver.id().as_ref(),
            driver.name(),
            driver.effective_priority(),
            if days.is_empty() { "none".to_string() } else { days.join(",") }
        ));
    }

    prompt.push_str("\nTrips:\n");
    for trip in trips {
        let slot = TripSlot::of(trip, options);
        let time = trip
            .planned_arrival_time()
            .filter(|t| parse_hhmm(t).is_some())
            .unwrap_or("unknown");
        let day = if slot.is_night_shift() {
            format!(
                "{} (night shift for {})",
                weekday_name(slot.effective_day),
                weekday_name(slot.calendar_day)
            )
        } else {
            weekday_name(slot.effective_day).to_string()
        };
        prompt.push_str(&format!(
            "- id={} label={} date={} time={} effective_day={}\n",
            trip.id().as_ref(),
            trip.label(),
            trip.trip_date().format("%Y-%m-%d"),
            time,
            day
        ));
    }

    if !committed.is_empty() {
        prompt.push_str("\nCommitted trips:\n");
        for assignment in committed {
            prompt.push_str(&format!(
                "- driver={} date={} time={}\n",
                assignment.driver_id().as_ref(),
                assignment.trip_date().format("%Y-%m-%d"),
                assignment.planned_arrival_time().unwrap_or("unknown")
            ));
        }
    }

    prompt.push_str(
        "\nReply with JSON only, shaped as \
         {\"assignments\":[{\"tripId\":\"...\",\"driverId\":\"...\",\"reasoning\":\"...\"}]}\n",
    );
    prompt
}

/// Pull the JSON object out of a model reply.
///
/// Prefers a fenced code block, falls back to the outermost braces. Text that
/// is already valid JSON is returned untouched; otherwise trailing commas
/// outside string literals are stripped.
pub fn extract_json(text: &str) -> Result<String, ProposalError> {
    let body = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|body| body.contains('{'))
        .unwrap_or(text);

    let start = body.find('{').ok_or(ProposalError::NoJson)?;
    let end = body.rfind('}').ok_or(ProposalError::NoJson)?;
    if end < start {
        return Err(ProposalError::NoJson);
    }

    let json = &body[start..=end];
    if serde_json::from_str::<serde_json::Value>(json).is_ok() {
        return Ok(json.to_string());
    }
    Ok(strip_trailing_commas(json))
}

/// Drop commas that are followed only by whitespace and a closing bracket.
/// String literals (including escaped quotes) are copied verbatim.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in json.char_indices() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let rest = json[idx + 1..].trim_start();
                if !(rest.starts_with('}') || rest.starts_with(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

pub fn parse_proposal(text: &str) -> Result<Vec<ProposedAssignment>, ProposalError> {
    let json = extract_json(text)?;
    let envelope: ProposalEnvelope = serde_json::from_str(&json)?;
    Ok(envelope.assignments)
}

/// Re-check a proposal and turn the acceptable part into a normal result.
///
/// Proposals are applied in order; the first acceptable one for a trip wins.
/// Accepted assignments come back in trip input order.
pub fn validate_proposal<T, D, C>(
    proposed: &[ProposedAssignment],
    trips: &[T],
    drivers: &[D],
    committed: &[C],
    options: &AssignOptions,
) -> AssignmentResult<T::Id, D::Id>
where
    T: Trip,
    T::Id: AsRef<str>,
    D: Driver,
    D::Id: AsRef<str>,
    C: CommittedAssignment<DriverId = D::Id>,
{
    if trips.is_empty() {
        return AssignmentResult::empty();
    }
    if drivers.is_empty() {
        return AssignmentResult::no_drivers(trips.len());
    }

    let mut roster = Roster::new(drivers, committed, options);

    let mut trip_lookup: HashMap<&str, usize> = HashMap::with_capacity(trips.len());
    for (idx, trip) in trips.iter().enumerate() {
        trip_lookup.entry(trip.id().as_ref()).or_insert(idx);
    }
    let mut driver_lookup: HashMap<&str, usize> = HashMap::with_capacity(drivers.len());
    for (idx, driver) in drivers.iter().enumerate() {
        driver_lookup.entry(driver.id().as_ref()).or_insert(idx);
    }

    let mut accepted: Vec<Option<Assignment<T::Id, D::Id>>> = vec![None; trips.len()];
    let mut mentioned = vec![false; trips.len()];
    let mut warnings = Vec::new();

    for proposal in proposed {
        let Some(&trip_idx) = trip_lookup.get(proposal.trip_id.as_str()) else {
            warnings.push(format!("Proposal references unknown trip {}", proposal.trip_id));
            continue;
        };
        let trip = &trips[trip_idx];
        mentioned[trip_idx] = true;

        let Some(&driver_idx) = driver_lookup.get(proposal.driver_id.as_str()) else {
            warnings.push(format!(
                "Trip {}: proposal references unknown driver {}",
                trip.label(),
                proposal.driver_id
            ));
            continue;
        };
        if accepted[trip_idx].is_some() {
            debug!(trip = trip.label(), "duplicate proposal ignored");
            continue;
        }

        let driver = roster.driver(driver_idx);
        let slot = TripSlot::of(trip, options);
        if !driver.available_on(slot.effective_day) {
            warnings.push(format!(
                "Trip {}: proposed driver {} is not available on {}",
                trip.label(),
                driver.name(),
                weekday_name(slot.effective_day)
            ));
            continue;
        }
        if roster.has_conflict(driver_idx, slot.timestamp) {
            warnings.push(format!(
                "Trip {}: proposed driver {} has a conflicting trip near {}",
                trip.label(),
                driver.name(),
                slot.timestamp.format("%Y-%m-%d %H:%M")
            ));
            continue;
        }

        let text = proposal
            .reasoning
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| reasoning(&slot, driver));
        accepted[trip_idx] = Some(Assignment {
            trip_id: trip.id().clone(),
            driver_id: driver.id().clone(),
            reasoning: text,
        });
        roster.record(driver_idx, slot.timestamp);
    }

    for (idx, trip) in trips.iter().enumerate() {
        if accepted[idx].is_none() && !mentioned[idx] {
            warnings.push(format!("Trip {}: not covered by proposal", trip.label()));
        }
    }

    let assignments = accepted.into_iter().flatten().collect();
    roster.finish(assignments, warnings, trips.len())
}

/// Ask `source` for a proposal; fall back to [`assign_trips`] if the call or
/// parsing fails.
///
/// Rejected proposal entries do not trigger the fallback; they show up as
/// warnings like any other unassigned trip.
pub fn propose_or_assign<S, T, D, C>(
    source: &S,
    trips: &[T],
    drivers: &[D],
    committed: &[C],
    options: &AssignOptions,
) -> AssignmentResult<T::Id, D::Id>
where
    S: ProposalSource + ?Sized,
    T: Trip,
    T::Id: AsRef<str>,
    D: Driver,
    D::Id: AsRef<str>,
    C: CommittedAssignment<DriverId = D::Id>,
{
    if trips.is_empty() || drivers.is_empty() {
        return assign_trips(trips, drivers, committed, options);
    }

    let prompt = build_prompt(trips, drivers, committed, options);
    match source.complete(&prompt).and_then(|text| parse_proposal(&text)) {
        Ok(proposed) => validate_proposal(&proposed, trips, drivers, committed, options),
        Err(err) => {
            warn!(error = %err, "proposal unavailable, using deterministic assignment");
            assign_trips(trips, drivers, committed, options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_json_fence() {
        let text = "Here you go:\n```json\n{\"assignments\": []}\n```\nThanks";
        assert_eq!(extract_json(text).unwrap(), "{\"assignments\": []}");
    }

    #[test]
    fn test_extract_from_bare_braces() {
        let text = "Sure! {\"assignments\": [{\"tripId\": \"t1\", \"driverId\": \"d1\"}]} done";
        let json = extract_json(text).unwrap();
        assert!(json.starts_with('{') && json.ends_with('}'));
    }

    #[test]
    fn test_trailing_commas_removed() {
        let text = "{\"assignments\": [{\"tripId\": \"t1\", \"driverId\": \"d1\",},],}";
        let json = extract_json(text).unwrap();
        assert_eq!(json, "{\"assignments\": [{\"tripId\": \"t1\", \"driverId\": \"d1\"}]}");
    }

    #[test]
    fn test_commas_inside_strings_are_kept() {
        let text = r#"{"assignments": [{"tripId": "t1", "driverId": "d1", "reasoning": "Ana, }"},]}"#;
        let json = extract_json(text).unwrap();
        assert_eq!(
            json,
            r#"{"assignments": [{"tripId": "t1", "driverId": "d1", "reasoning": "Ana, }"}]}"#
        );
    }

    #[test]
    fn test_valid_json_is_untouched() {
        let text = r#"{"assignments": [{"tripId": "t1", "driverId": "d1", "reasoning": "Ana, ]"}]}"#;
        assert_eq!(extract_json(text).unwrap(), text);
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let text = r#"{"assignments": [{"tripId": "t1", "driverId": "d1", "reasoning": "say \",}\" ok",},]}"#;
        let proposed = parse_proposal(text).unwrap();
        assert_eq!(proposed[0].reasoning.as_deref(), Some("say \",}\" ok"));
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(extract_json("I cannot help"), Err(ProposalError::NoJson)));
        assert!(matches!(extract_json("} backwards {"), Err(ProposalError::NoJson)));
    }

    #[test]
    fn test_parse_accepts_snake_case_keys() {
        let proposed =
            parse_proposal(r#"{"assignments":[{"trip_id":"t1","driver_id":"d1"}]}"#).unwrap();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].trip_id, "t1");
        assert_eq!(proposed[0].driver_id, "d1");
        assert_eq!(proposed[0].reasoning, None);
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = parse_proposal(r#"{"assignments":[{"trip":"t1"}]}"#).unwrap_err();
        assert!(matches!(err, ProposalError::Decode(_)));
    }
}
