//! Availability calculator.
//!
//! Team bookings are a pure projection of the job collection: every open
//! job (pendente or em execução) with a team and a planned date occupies
//! `[start, start + duration)`. Each day is shown as a fixed grid of 28
//! ticks from 06:00 to 19:30, 30 minutes apart; a tick is busy when it
//! falls inside any booking. Nothing here is cached or persisted.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rayon::prelude::*;
use serde::Serialize;

use crate::duration::EstimatedDuration;
use crate::job::{BookableJob, Team};
use crate::types::{JobId, JobKind, JobStatus, TeamId, ValidationError};

/// Minutes between two grid ticks.
pub const SLOT_MINUTES: u32 = 30;

/// Ticks per day, 06:00 through 19:30.
pub const SLOTS_PER_DAY: usize = 28;

/// Longest range a single availability query may span.
pub const MAX_RANGE_DAYS: i64 = 92;

const DAY_START_HOUR: u32 = 6;

/// Time of the first tick of every day.
pub fn day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(DAY_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// The fixed tick times of a day.
pub fn slot_times() -> impl Iterator<Item = NaiveTime> {
    let start = day_start();
    (0..SLOTS_PER_DAY).map(move |i| {
        let offset = i64::from(SLOT_MINUTES) * i64::try_from(i).unwrap_or(0);
        start + Duration::minutes(offset)
    })
}

/// Half-open interval overlap: `a.start < b.end && b.start < a.end`.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// An inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting inverted or overlong spans.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvertedDateRange { start, end });
        }
        let days = (end - start).num_days() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(ValidationError::DateRangeTooLong {
                days,
                max: MAX_RANGE_DAYS,
            });
        }
        Ok(Self { start, end })
    }

    pub const fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Every day touched by an interval, from its start date through its end
    /// date. Not capped: a long booking still spans all of its days.
    pub fn spanning(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: start.date(),
            end: end.date().max(start.date()),
        }
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// The same range widened by one day before its start.
    ///
    /// Used to catch bookings that start the previous evening and run past
    /// midnight.
    pub fn with_previous_day(&self) -> Self {
        Self {
            start: self.start.checked_sub_days(Days::new(1)).unwrap_or(self.start),
            end: self.end,
        }
    }
}

/// A team's occupied interval, derived from a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamBooking {
    pub team_id: TeamId,
    pub job_id: JobId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub status: JobStatus,
}

impl TeamBooking {
    /// Projects a job into a booking.
    ///
    /// Budgets, closed jobs and jobs without a team or planned date never
    /// occupy a slot. A job with no stored duration holds one slot.
    pub fn from_job<J: BookableJob + ?Sized>(job: &J) -> Option<Self> {
        if job.kind() == JobKind::Budget || !job.status().occupies_team() {
            return None;
        }
        let team_id = job.team()?.clone();
        let start = job.planned_at()?;
        let duration_minutes = occupied_minutes(job.duration_minutes());
        Some(Self {
            team_id,
            job_id: job.job_id().clone(),
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
            duration_minutes,
            status: job.status(),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        overlaps(self.start, self.end, start, end)
    }

    /// Whether a tick falls inside `[start, end)`.
    pub fn covers(&self, tick: NaiveDateTime) -> bool {
        self.start <= tick && tick < self.end
    }
}

/// Minutes a booking holds: the stored duration, or one slot when unknown.
pub fn occupied_minutes(duration_minutes: Option<u32>) -> u32 {
    match duration_minutes {
        Some(minutes) if minutes > 0 => minutes,
        _ => SLOT_MINUTES,
    }
}

/// Minutes a candidate booking would hold.
pub fn candidate_minutes(duration: Option<&EstimatedDuration>) -> u32 {
    occupied_minutes(duration.map(EstimatedDuration::rounded_minutes))
}

/// Bookings of one team whose start date lies in the range, by start time.
///
/// `exclude` drops the job being edited so it never conflicts with itself.
pub fn team_bookings<J: BookableJob>(
    jobs: &[J],
    team: &TeamId,
    range: &DateRange,
    exclude: Option<&JobId>,
) -> Vec<TeamBooking> {
    let mut bookings: Vec<TeamBooking> = jobs
        .iter()
        .filter(|job| exclude != Some(job.job_id()))
        .filter_map(TeamBooking::from_job)
        .filter(|b| &b.team_id == team && range.contains(b.date()))
        .collect();
    bookings.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.job_id.cmp(&b.job_id)));
    bookings
}

/// Whether a grid tick is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Free,
    Busy,
}

/// One tick of the day grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub state: SlotState,
}

/// The day grid for a date. Always [`SLOTS_PER_DAY`] entries.
pub fn slots(date: NaiveDate, bookings: &[TeamBooking]) -> Vec<Slot> {
    slot_times()
        .map(|time| {
            let tick = date.and_time(time);
            let state = if bookings.iter().any(|b| b.covers(tick)) {
                SlotState::Busy
            } else {
                SlotState::Free
            };
            Slot { time, state }
        })
        .collect()
}

/// Available and booked ticks of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    #[serde(with = "hhmm::list")]
    pub available: Vec<NaiveTime>,
    #[serde(with = "hhmm::list")]
    pub booked: Vec<NaiveTime>,
    pub bookings: Vec<TeamBooking>,
}

impl DaySlots {
    pub fn from_bookings(date: NaiveDate, bookings: Vec<TeamBooking>) -> Self {
        let (free, busy): (Vec<Slot>, Vec<Slot>) = slots(date, &bookings)
            .into_iter()
            .partition(|s| s.state == SlotState::Free);
        Self {
            date,
            available: free.into_iter().map(|s| s.time).collect(),
            booked: busy.into_iter().map(|s| s.time).collect(),
            bookings,
        }
    }

    pub fn is_available(&self, time: NaiveTime) -> bool {
        self.available.contains(&time)
    }
}

/// Busy intervals of a team, grouped by day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAvailability {
    pub team_id: TeamId,
    pub range: DateRange,
    /// One entry per day in the range, including empty days.
    pub days: Vec<(NaiveDate, Vec<TeamBooking>)>,
}

/// Collects a team's bookings for every day of the range.
///
/// A booking that runs past midnight also marks the next day's ticks it
/// covers.
pub fn team_availability<J: BookableJob>(
    jobs: &[J],
    team: &TeamId,
    range: &DateRange,
    exclude: Option<&JobId>,
) -> TeamAvailability {
    let bookings = team_bookings(jobs, team, &range.with_previous_day(), exclude);
    let days = range
        .days()
        .map(|date| {
            let day_start = date.and_time(NaiveTime::MIN);
            let day_end = day_start + Duration::days(1);
            let touching = bookings
                .iter()
                .filter(|b| b.overlaps(day_start, day_end))
                .cloned()
                .collect();
            (date, touching)
        })
        .collect();
    TeamAvailability {
        team_id: team.clone(),
        range: *range,
        days,
    }
}

/// Answer to `getAvailability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub team_id: TeamId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub days: Vec<DaySlots>,
    pub duration_text: Option<String>,
}

impl AvailabilityReport {
    pub fn day(&self, date: NaiveDate) -> Option<&DaySlots> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Available and booked ticks for a team over a range.
///
/// `duration` is the estimate of the job being scheduled, echoed back as
/// display text.
pub fn get_availability<J: BookableJob>(
    jobs: &[J],
    team: &TeamId,
    range: &DateRange,
    duration: Option<&EstimatedDuration>,
    exclude: Option<&JobId>,
) -> AvailabilityReport {
    let availability = team_availability(jobs, team, range, exclude);
    let days = availability
        .days
        .into_iter()
        .map(|(date, bookings)| DaySlots::from_bookings(date, bookings))
        .collect();
    AvailabilityReport {
        team_id: availability.team_id,
        team_name: None,
        days,
        duration_text: duration.map(EstimatedDuration::text),
    }
}

/// Availability of every team in the directory, one report per team.
pub fn calendar<J: BookableJob + Sync>(
    jobs: &[J],
    teams: &[Team],
    range: &DateRange,
) -> Vec<AvailabilityReport> {
    tracing::debug!(teams = teams.len(), jobs = jobs.len(), "computing calendar");
    teams
        .par_iter()
        .map(|team| {
            let mut report = get_availability(jobs, &team.id, range, None, None);
            report.team_name = Some(team.name.clone()).filter(|n| !n.is_empty());
            report
        })
        .collect()
}

/// `"HH:mm"` serialization for grid times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    const FORMAT: &str = "%H:%M";

    pub fn format(time: NaiveTime) -> String {
        time.format(FORMAT).to_string()
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(*time))
    }

    pub mod list {
        use chrono::NaiveTime;
        use serde::Serializer;
        use serde::ser::SerializeSeq;

        #[allow(clippy::ptr_arg)]
        pub fn serialize<S>(times: &Vec<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut seq = serializer.serialize_seq(Some(times.len()))?;
            for time in times {
                seq.serialize_element(&super::format(*time))?;
            }
            seq.end()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal job fixture for availability tests.
    #[derive(Debug, Clone)]
    pub(crate) struct TestJob {
        pub id: JobId,
        pub kind: JobKind,
        pub status: JobStatus,
        pub team: Option<TeamId>,
        pub planned_at: Option<NaiveDateTime>,
        pub minutes: Option<u32>,
    }

    impl TestJob {
        pub(crate) fn booked(id: &str, team: &str, at: &str, minutes: u32) -> Self {
            Self {
                id: JobId::new(id).unwrap(),
                kind: JobKind::Job,
                status: JobStatus::Pendente,
                team: Some(TeamId::new(team).unwrap()),
                planned_at: Some(crate::types::parse_datetime(at).unwrap()),
                minutes: Some(minutes),
            }
        }
    }

    impl BookableJob for TestJob {
        fn job_id(&self) -> &JobId {
            &self.id
        }

        fn kind(&self) -> JobKind {
            self.kind
        }

        fn status(&self) -> JobStatus {
            self.status
        }

        fn team(&self) -> Option<&TeamId> {
            self.team.as_ref()
        }

        fn planned_at(&self) -> Option<NaiveDateTime> {
            self.planned_at
        }

        fn duration_minutes(&self) -> Option<u32> {
            self.minutes
        }
    }

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub(crate) fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn team(id: &str) -> TeamId {
        TeamId::new(id).unwrap()
    }

    // ========== Grid ==========

    #[test]
    fn grid_has_28_ticks_from_six_to_half_past_seven() {
        let times: Vec<NaiveTime> = slot_times().collect();
        assert_eq!(times.len(), SLOTS_PER_DAY);
        assert_eq!(times.first(), Some(&time("06:00")));
        assert_eq!(times.last(), Some(&time("19:30")));
    }

    #[test]
    fn slot_count_is_independent_of_bookings() {
        let day = date("2024-05-01");
        assert_eq!(slots(day, &[]).len(), SLOTS_PER_DAY);

        let jobs: Vec<TestJob> = (0..40)
            .map(|i| TestJob::booked(&format!("j{i}"), "a", "2024-05-01T06:00", 900))
            .collect();
        let bookings = team_bookings(&jobs, &team("a"), &DateRange::single(day), None);
        assert_eq!(slots(day, &bookings).len(), SLOTS_PER_DAY);
    }

    #[test]
    fn overlap_is_half_open() {
        let at = |s: &str| crate::types::parse_datetime(s).unwrap();
        assert!(overlaps(
            at("2024-05-01T08:00"),
            at("2024-05-01T10:00"),
            at("2024-05-01T09:00"),
            at("2024-05-01T10:00")
        ));
        assert!(!overlaps(
            at("2024-05-01T08:00"),
            at("2024-05-01T10:00"),
            at("2024-05-01T10:00"),
            at("2024-05-01T11:00")
        ));
    }

    // ========== Projection ==========

    #[test]
    fn closed_jobs_and_budgets_do_not_book() {
        let mut done = TestJob::booked("done", "a", "2024-05-01T08:00", 120);
        done.status = JobStatus::Concluida;
        let mut cancelled = TestJob::booked("cancelled", "a", "2024-05-01T08:00", 120);
        cancelled.status = JobStatus::Cancelada;
        let mut budget = TestJob::booked("budget", "a", "2024-05-01T08:00", 120);
        budget.kind = JobKind::Budget;
        let mut running = TestJob::booked("running", "a", "2024-05-01T08:00", 120);
        running.status = JobStatus::EmExecucao;

        assert!(TeamBooking::from_job(&done).is_none());
        assert!(TeamBooking::from_job(&cancelled).is_none());
        assert!(TeamBooking::from_job(&budget).is_none());
        assert!(TeamBooking::from_job(&running).is_some());
    }

    #[test]
    fn unscheduled_jobs_do_not_book() {
        let mut no_date = TestJob::booked("x", "a", "2024-05-01T08:00", 60);
        no_date.planned_at = None;
        let mut no_team = TestJob::booked("y", "a", "2024-05-01T08:00", 60);
        no_team.team = None;
        assert!(TeamBooking::from_job(&no_date).is_none());
        assert!(TeamBooking::from_job(&no_team).is_none());
    }

    #[test]
    fn unknown_duration_holds_one_slot() {
        let mut job = TestJob::booked("x", "a", "2024-05-01T08:00", 0);
        job.minutes = None;
        let booking = TeamBooking::from_job(&job).unwrap();
        assert_eq!(booking.duration_minutes, SLOT_MINUTES);
        assert_eq!(booking.end.time(), time("08:30"));
    }

    #[test]
    fn team_bookings_filters_team_range_and_exclusion() {
        let jobs = vec![
            TestJob::booked("b", "a", "2024-05-01T13:00", 60),
            TestJob::booked("a", "a", "2024-05-01T08:00", 60),
            TestJob::booked("other-team", "b", "2024-05-01T08:00", 60),
            TestJob::booked("other-day", "a", "2024-05-02T08:00", 60),
        ];
        let range = DateRange::single(date("2024-05-01"));

        let bookings = team_bookings(&jobs, &team("a"), &range, None);
        let ids: Vec<&str> = bookings
            .iter()
            .map(|b| b.job_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        let excluded = team_bookings(&jobs, &team("a"), &range, Some(&JobId::new("a").unwrap()));
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].job_id.as_str(), "b");
    }

    // ========== Slots ==========

    #[test]
    fn booking_marks_ticks_inside_half_open_interval() {
        let jobs = vec![TestJob::booked("j", "a", "2024-05-01T08:00", 120)];
        let report = get_availability(
            &jobs,
            &team("a"),
            &DateRange::single(date("2024-05-01")),
            None,
            None,
        );
        let day = &report.days[0];
        assert_eq!(
            day.booked,
            vec![time("08:00"), time("08:30"), time("09:00"), time("09:30")]
        );
        assert!(day.is_available(time("10:00")));
        assert_eq!(day.available.len() + day.booked.len(), SLOTS_PER_DAY);
    }

    #[test]
    fn booking_past_midnight_marks_next_day() {
        let jobs = vec![TestJob::booked("late", "a", "2024-05-01T19:00", 12 * 60)];
        let range = DateRange::new(date("2024-05-01"), date("2024-05-02")).unwrap();
        let report = get_availability(&jobs, &team("a"), &range, None, None);

        assert_eq!(report.days[0].booked, vec![time("19:00"), time("19:30")]);
        assert_eq!(
            report.days[1].booked,
            vec![time("06:00"), time("06:30")]
        );
    }

    #[test]
    fn report_serializes_hhmm() {
        let jobs = vec![TestJob::booked("j", "a", "2024-05-01T19:00", 60)];
        let mut report = get_availability(
            &jobs,
            &team("a"),
            &DateRange::single(date("2024-05-01")),
            Some(&EstimatedDuration::from_work(90.0)),
            None,
        );
        report.days[0].bookings.clear();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["durationText"], "2h");
        assert_eq!(json["days"][0]["booked"], serde_json::json!(["19:00", "19:30"]));
        assert_eq!(json["days"][0]["available"][0], "06:00");
    }

    // ========== Ranges ==========

    #[test]
    fn date_range_validates() {
        assert!(matches!(
            DateRange::new(date("2024-05-02"), date("2024-05-01")),
            Err(ValidationError::InvertedDateRange { .. })
        ));
        assert!(matches!(
            DateRange::new(date("2024-01-01"), date("2024-06-01")),
            Err(ValidationError::DateRangeTooLong { .. })
        ));
        let range = DateRange::new(date("2024-05-30"), date("2024-06-02")).unwrap();
        assert_eq!(range.days().count(), 4);
    }

    #[test]
    fn calendar_covers_every_team() {
        let jobs = vec![
            TestJob::booked("j1", "a", "2024-05-01T08:00", 60),
            TestJob::booked("j2", "b", "2024-05-01T14:00", 60),
        ];
        let teams = vec![
            Team {
                id: team("a"),
                name: "Equipe A".to_string(),
            },
            Team {
                id: team("b"),
                name: String::new(),
            },
        ];
        let reports = calendar(&jobs, &teams, &DateRange::single(date("2024-05-01")));

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].team_name.as_deref(), Some("Equipe A"));
        assert_eq!(reports[0].days[0].booked, vec![time("08:00"), time("08:30")]);
        assert_eq!(reports[1].team_name, None);
        assert_eq!(reports[1].days[0].booked, vec![time("14:00"), time("14:30")]);
    }

    #[test]
    fn queries_are_repeatable() {
        let jobs = vec![TestJob::booked("j", "a", "2024-05-01T08:00", 95)];
        let range = DateRange::single(date("2024-05-01"));
        assert_eq!(
            get_availability(&jobs, &team("a"), &range, None, None),
            get_availability(&jobs, &team("a"), &range, None, None)
        );
    }
}
