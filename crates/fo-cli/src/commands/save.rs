//! Save command: validate a draft, freeze its figures and store it.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use fo_core::{Job, JobDraft, JobId, TeamBooking, format_duration, snapshot};
use fo_db::{Database, SaveOutcome};

use super::check::gate;
use super::util::{booking_line, money, read_json, write_json};

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Draft JSON file, or `-` for stdin.
    pub draft: PathBuf,

    /// ID of the saved job being edited; overrides the draft's own ID.
    #[arg(long)]
    pub job: Option<String>,

    /// Output the saved job as JSON.
    #[arg(long)]
    pub json: bool,
}

/// JSON output of a save: the stored job plus any bookings it overlaps.
#[derive(Debug, Serialize)]
struct SaveReport<'a> {
    #[serde(flatten)]
    job: &'a Job,
    conflicts: &'a [TeamBooking],
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &SaveArgs) -> Result<Job> {
    let mut draft: JobDraft = read_json(&args.draft)?;
    if let Some(job) = &args.job {
        draft.id = Some(JobId::new(job.as_str())?);
    }
    let Saved {
        job,
        outcome,
        conflicts,
    } = save(db, draft)?;

    if args.json {
        let report = SaveReport {
            job: &job,
            conflicts: &conflicts,
        };
        write_json(writer, &report)?;
        return Ok(job);
    }
    if let Some(team) = &job.team_ref
        && !conflicts.is_empty()
    {
        writeln!(writer, "WARNING: team {team} is already booked:")?;
        for booking in &conflicts {
            writeln!(writer, "  - {}", booking_line(booking))?;
        }
    }
    let verb = match outcome {
        SaveOutcome::Created => "Created",
        SaveOutcome::Updated => "Updated",
    };
    let duration = job
        .estimated_duration_minutes
        .map_or_else(|| "unknown".to_string(), format_duration);
    writeln!(
        writer,
        "{verb} {} {}: final {}, duration {duration}",
        job.kind,
        job.id,
        money(job.final_value)
    )?;
    Ok(job)
}

/// A stored job and the existing bookings it overlaps.
#[derive(Debug)]
pub struct Saved {
    pub job: Job,
    pub outcome: SaveOutcome,
    pub conflicts: Vec<TeamBooking>,
}

/// Snapshots and stores a draft, assigning a fresh ID to new documents.
///
/// Overlapping bookings are returned for the caller to report; they never
/// block the save.
pub fn save(db: &mut Database, mut draft: JobDraft) -> Result<Saved> {
    if draft.id.is_none() {
        draft.id = Some(JobId::new(Uuid::new_v4().to_string())?);
    }
    let catalog = db.load_catalog().context("failed to load catalog")?;
    let job = snapshot(&draft, &catalog).context("draft cannot be saved")?;

    let conflicts = gate(db, &draft)?.map_or_else(Vec::new, |o| o.conflicts);
    if !conflicts.is_empty() {
        tracing::warn!(job = %job.id, conflicts = conflicts.len(), "saving over existing bookings");
    }

    let outcome = db.save_job(&job).context("failed to save job")?;
    Ok(Saved {
        job,
        outcome,
        conflicts,
    })
}
