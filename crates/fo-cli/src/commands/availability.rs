//! Availability command: a team's free and booked slots over a date range.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use fo_core::{AvailabilityReport, EstimatedDuration, JobId, TeamId, get_availability};
use fo_db::Database;

use super::util::{booking_line, parse_range, windows, write_json};

#[derive(Debug, Args)]
pub struct AvailabilityArgs {
    /// Team ID.
    #[arg(long)]
    pub team: String,

    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub date: String,

    /// Last day, inclusive (YYYY-MM-DD). Defaults to --date.
    #[arg(long)]
    pub until: Option<String>,

    /// Estimated duration of the job being scheduled, in minutes.
    #[arg(long)]
    pub duration: Option<u32>,

    /// Job being edited, whose own booking is ignored.
    #[arg(long)]
    pub exclude: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &AvailabilityArgs) -> Result<()> {
    let team = TeamId::new(args.team.as_str())?;
    let range = parse_range(&args.date, args.until.as_deref())?;
    let exclude = args.exclude.as_deref().map(JobId::new).transpose()?;
    let duration = args.duration.map(EstimatedDuration::from_stored);

    let jobs = db
        .list_team_jobs(&team, &range)
        .with_context(|| format!("failed to load jobs for team {team}"))?;
    let name = db
        .list_teams()
        .context("failed to list teams")?
        .into_iter()
        .find(|t| t.id == team)
        .map(|t| t.name);
    if name.is_none() {
        tracing::warn!(%team, "team is not in the directory");
    }

    let mut report = get_availability(&jobs, &team, &range, duration.as_ref(), exclude.as_ref());
    report.team_name = name.filter(|n| !n.is_empty());

    if args.json {
        return write_json(writer, &report);
    }
    write_report(writer, &report)?;
    Ok(())
}

pub fn write_report<W: Write>(writer: &mut W, report: &AvailabilityReport) -> std::io::Result<()> {
    match &report.team_name {
        Some(name) => writeln!(writer, "Team {} ({name})", report.team_id)?,
        None => writeln!(writer, "Team {}", report.team_id)?,
    }
    if let Some(text) = &report.duration_text {
        writeln!(writer, "Estimated duration: {text}")?;
    }
    for day in &report.days {
        writeln!(
            writer,
            "{}: {} free, {} booked",
            day.date,
            day.available.len(),
            day.booked.len()
        )?;
        if !day.available.is_empty() {
            writeln!(writer, "  free:   {}", windows(&day.available))?;
        }
        if !day.booked.is_empty() {
            writeln!(writer, "  booked: {}", windows(&day.booked))?;
        }
        for booking in &day.bookings {
            writeln!(writer, "  - {}", booking_line(booking))?;
        }
    }
    Ok(())
}
