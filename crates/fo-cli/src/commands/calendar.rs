//! Calendar command: every team's day grids over a date range.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

use fo_core::availability::slot_times;
use fo_core::{AvailabilityReport, DaySlots, calendar};
use fo_db::Database;

use super::util::{parse_range, write_json};

#[derive(Debug, Args)]
pub struct CalendarArgs {
    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub from: String,

    /// Last day, inclusive (YYYY-MM-DD). Defaults to --from.
    #[arg(long)]
    pub to: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &CalendarArgs) -> Result<()> {
    let range = parse_range(&args.from, args.to.as_deref())?;
    let teams = db.list_teams().context("failed to list teams")?;
    let jobs = db
        .list_jobs_in_range(&range)
        .context("failed to load jobs")?;
    let reports = calendar(&jobs, &teams, &range);

    if args.json {
        return write_json(writer, &reports);
    }
    write_calendar(writer, &reports)?;
    Ok(())
}

fn grid(day: &DaySlots) -> String {
    slot_times()
        .map(|tick| if day.booked.contains(&tick) { '#' } else { '.' })
        .collect()
}

pub fn write_calendar<W: Write>(writer: &mut W, reports: &[AvailabilityReport]) -> std::io::Result<()> {
    if reports.is_empty() {
        writeln!(writer, "No teams in the directory.")?;
        return Ok(());
    }
    writeln!(writer, "Grid 06:00-20:00, one mark per 30 minutes (# booked)")?;
    for report in reports {
        writeln!(writer)?;
        match &report.team_name {
            Some(name) => writeln!(writer, "{name} ({})", report.team_id)?,
            None => writeln!(writer, "{}", report.team_id)?,
        }
        for day in &report.days {
            let jobs = match day.bookings.len() {
                0 => String::new(),
                1 => "  1 job".to_string(),
                n => format!("  {n} jobs"),
            };
            writeln!(writer, "  {}  {}{jobs}", day.date, grid(day))?;
        }
    }
    Ok(())
}
