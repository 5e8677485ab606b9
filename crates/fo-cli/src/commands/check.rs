//! Check command: run the booking conflict gate for a draft.
//!
//! Conflicts are reported as a warning; the command still succeeds so the
//! operator can decide whether to save anyway.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fo_core::{GateOutcome, GateRequest, JobDraft, JobId, JobKind, check_booking};
use fo_db::Database;

use super::util::{booking_line, read_json, windows, write_json};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Draft JSON file, or `-` for stdin.
    pub draft: PathBuf,

    /// ID of the saved job being edited; overrides the draft's own ID.
    #[arg(long)]
    pub job: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &CheckArgs) -> Result<Option<GateOutcome>> {
    let mut draft: JobDraft = read_json(&args.draft)?;
    if let Some(job) = &args.job {
        draft.id = Some(JobId::new(job.as_str())?);
    }

    let outcome = gate(db, &draft)?;
    if args.json {
        write_json(writer, &outcome)?;
        return Ok(outcome);
    }
    match &outcome {
        Some(outcome) => write_outcome(writer, outcome)?,
        None => writeln!(writer, "Nothing to check: {}", skip_reason(&draft))?,
    }
    Ok(outcome)
}

/// Loads what the gate needs and runs it. `None` when the draft books no team.
pub fn gate(db: &Database, draft: &JobDraft) -> Result<Option<GateOutcome>> {
    if !draft.books_team() || draft.team_ref.is_none() || draft.planned_at.is_none() {
        return Ok(None);
    }
    let catalog = db.load_catalog().context("failed to load catalog")?;
    let Some(request) = GateRequest::for_draft(draft, &catalog) else {
        return Ok(None);
    };
    // The store adds the previous day; the request spans every day it touches.
    let jobs = db
        .list_team_jobs(&request.team, &request.days())
        .with_context(|| format!("failed to load jobs for team {}", request.team))?;
    Ok(Some(check_booking(&jobs, &request)))
}

fn skip_reason(draft: &JobDraft) -> &'static str {
    if draft.kind == JobKind::Budget {
        "budgets do not book a team"
    } else if !draft.status.occupies_team() {
        "closed jobs do not book a team"
    } else if draft.team_ref.is_none() {
        "no team assigned"
    } else {
        "no planned date"
    }
}

pub fn write_outcome<W: Write>(writer: &mut W, outcome: &GateOutcome) -> std::io::Result<()> {
    let end = if outcome.end.date() == outcome.date {
        outcome.end.format("%H:%M").to_string()
    } else {
        outcome.end.format("%Y-%m-%d %H:%M").to_string()
    };
    write!(
        writer,
        "Team {}, {} {}-{end}",
        outcome.team_id,
        outcome.date,
        outcome.start.format("%H:%M")
    )?;
    match &outcome.duration_text {
        Some(text) => writeln!(writer, " ({text})")?,
        None => writeln!(writer, " (duration unknown)")?,
    }

    if outcome.conflict {
        let n = outcome.conflicts.len();
        let noun = if n == 1 { "booking" } else { "bookings" };
        writeln!(writer, "WARNING: overlaps {n} existing {noun}")?;
        for booking in &outcome.conflicts {
            writeln!(writer, "  - {}", booking_line(booking))?;
        }
    } else {
        writeln!(writer, "No conflicts.")?;
    }
    writeln!(writer, "Free: {}", windows(&outcome.available))?;
    Ok(())
}
