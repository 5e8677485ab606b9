//! Booking conflict gate.
//!
//! Re-run whenever the team, planned date or services of a draft change.
//! Conflicts are advisory: the outcome says what overlaps and the caller
//! decides whether to proceed.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::availability::{
    DateRange, DaySlots, TeamBooking, candidate_minutes, hhmm, team_availability, team_bookings,
};
use crate::catalog::Catalog;
use crate::duration::{EstimatedDuration, job_duration};
use crate::job::{BookableJob, JobDraft};
use crate::types::{JobId, TeamId};

/// A proposed booking to test against a team's schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct GateRequest {
    pub team: TeamId,
    pub planned_at: NaiveDateTime,
    /// Estimate of the job; `None` holds a single slot.
    pub duration: Option<EstimatedDuration>,
    /// The job being edited, whose own booking is ignored.
    pub exclude: Option<JobId>,
}

impl GateRequest {
    /// Builds the request for a draft, or `None` when the draft books no team.
    pub fn for_draft(draft: &JobDraft, catalog: &Catalog) -> Option<Self> {
        if !draft.books_team() {
            return None;
        }
        Some(Self {
            team: draft.team_ref.clone()?,
            planned_at: draft.planned_at?,
            duration: job_duration(&draft.services, catalog),
            exclude: draft.id.clone(),
        })
    }

    /// End of the proposed interval.
    pub fn end(&self) -> NaiveDateTime {
        let minutes = candidate_minutes(self.duration.as_ref());
        self.planned_at + Duration::minutes(i64::from(minutes))
    }

    /// The days the proposed interval touches, which may run past midnight.
    pub fn days(&self) -> DateRange {
        DateRange::spanning(self.planned_at, self.end())
    }
}

/// Result of a gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOutcome {
    pub team_id: TeamId,
    pub date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    pub start: chrono::NaiveTime,
    pub end: NaiveDateTime,
    #[serde(serialize_with = "hhmm::list::serialize")]
    pub available: Vec<chrono::NaiveTime>,
    #[serde(serialize_with = "hhmm::list::serialize")]
    pub booked: Vec<chrono::NaiveTime>,
    pub duration_text: Option<String>,
    pub conflict: bool,
    /// Existing bookings the proposed interval overlaps.
    pub conflicts: Vec<TeamBooking>,
}

/// Checks a proposed booking against the team's existing bookings.
pub fn check_booking<J: BookableJob>(jobs: &[J], request: &GateRequest) -> GateOutcome {
    let date = request.planned_at.date();
    let minutes = candidate_minutes(request.duration.as_ref());
    let start = request.planned_at;
    let end = request.end();
    let exclude = request.exclude.as_ref();

    // Bookings from the previous evening can run into the start day.
    let search = request.days().with_previous_day();
    let conflicts: Vec<TeamBooking> = team_bookings(jobs, &request.team, &search, exclude)
        .into_iter()
        .filter(|b| b.overlaps(start, end))
        .collect();

    let day = team_availability(jobs, &request.team, &DateRange::single(date), exclude)
        .days
        .into_iter()
        .next()
        .map_or_else(Vec::new, |(_, bookings)| bookings);
    let slots = DaySlots::from_bookings(date, day);

    if conflicts.is_empty() {
        tracing::debug!(team = %request.team, %start, minutes, "booking is free");
    } else {
        tracing::debug!(
            team = %request.team,
            %start,
            minutes,
            conflicts = conflicts.len(),
            "booking overlaps existing jobs"
        );
    }

    GateOutcome {
        team_id: request.team.clone(),
        date,
        start: start.time(),
        end,
        available: slots.available,
        booked: slots.booked,
        duration_text: request.duration.map(|d| d.text()),
        conflict: !conflicts.is_empty(),
        conflicts,
    }
}

/// Runs the gate for a draft.
///
/// Returns `None` when the draft cannot book a team: a budget, a closed
/// job, or one still missing its team or planned date. Editing a saved job
/// excludes its own prior booking.
pub fn check_draft<J: BookableJob>(
    jobs: &[J],
    draft: &JobDraft,
    catalog: &Catalog,
) -> Option<GateOutcome> {
    let request = GateRequest::for_draft(draft, catalog)?;
    Some(check_booking(jobs, &request))
}

/// The (team, date) pair an availability request was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AvailabilityKey {
    pub team: TeamId,
    pub date: NaiveDate,
}

/// Handle for one in-flight availability request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    key: AvailabilityKey,
}

impl Ticket {
    pub const fn key(&self) -> &AvailabilityKey {
        &self.key
    }
}

/// Keeps only the response to the most recent request.
///
/// Owned by the caller (one per editing session). Each new request issues a
/// ticket; a response is accepted only if its ticket is still the latest
/// one, so a slow answer for a stale (team, date) is dropped.
#[derive(Debug, Default)]
pub struct LatestWins {
    next_seq: u64,
    latest: Option<Ticket>,
}

impl LatestWins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request, superseding any earlier one.
    pub fn issue(&mut self, key: AvailabilityKey) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            key,
        };
        self.latest = Some(ticket.clone());
        ticket
    }

    /// Hands back the response if its ticket is still current.
    pub fn accept<T>(&self, ticket: &Ticket, response: T) -> Option<T> {
        if self.latest.as_ref() == Some(ticket) {
            Some(response)
        } else {
            tracing::debug!(
                team = %ticket.key.team,
                date = %ticket.key.date,
                "discarding stale availability response"
            );
            None
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest.as_ref() == Some(ticket)
    }
}
