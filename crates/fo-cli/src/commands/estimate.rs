//! Estimate command: recompute a draft against the stored catalog.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fo_core::service::IncompleteReason;
use fo_core::{EstimatedDuration, JobDraft, LineStatus, Recomputed, ServiceLine, TotalsMode, recompute};
use fo_db::Database;

use super::util::{money, read_json, write_json};

#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Draft JSON file, or `-` for stdin.
    pub draft: PathBuf,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &EstimateArgs) -> Result<()> {
    let draft: JobDraft = read_json(&args.draft)?;
    let catalog = db.load_catalog().context("failed to load catalog")?;
    let recomputed = recompute(&draft, &catalog).context("draft has invalid amounts")?;

    if args.json {
        return write_json(writer, &recomputed);
    }
    write_estimate(writer, &draft, &recomputed)?;
    Ok(())
}

/// Short label for a line: catalog reference or description, then its variation fields.
pub fn line_label(line: &ServiceLine) -> String {
    let mut parts = Vec::new();
    if let Some(catalog_ref) = &line.catalog_ref {
        parts.push(catalog_ref.to_string());
    } else if let Some(description) = line.description.as_deref().filter(|d| !d.is_empty()) {
        parts.push(description.to_string());
    } else {
        parts.push("service".to_string());
    }
    if let Some(diameter) = line.diameter {
        parts.push(diameter.to_string());
    }
    if let Some(soil_type) = line.soil_type {
        parts.push(soil_type.to_string());
    }
    if let Some(access) = line.access {
        parts.push(access.to_string());
    }
    parts.join(" ")
}

fn incomplete_text(reason: &IncompleteReason) -> String {
    match reason {
        IncompleteReason::MissingFields { fields } => format!("missing {}", fields.join(", ")),
        IncompleteReason::NoVariation => "no matching catalog variation".to_string(),
    }
}

pub fn write_estimate<W: Write>(
    writer: &mut W,
    draft: &JobDraft,
    recomputed: &Recomputed,
) -> std::io::Result<()> {
    writeln!(writer, "Services:")?;
    for (line, report) in draft.services.iter().zip(&recomputed.lines) {
        let label = line_label(line);
        let n = report.index + 1;
        match (&report.status, report.amounts) {
            (LineStatus::Incomplete(reason), _) => {
                writeln!(writer, "  {n}. {label}: incomplete, {}", incomplete_text(reason))?;
            }
            (_, None) => writeln!(writer, "  {n}. {label}: no value")?,
            (status, Some(amounts)) => {
                let manual = if matches!(status, LineStatus::Manual) {
                    " (manual)"
                } else {
                    ""
                };
                write!(
                    writer,
                    "  {n}. {label}{manual}: {} - {} = {}",
                    money(amounts.value),
                    amounts.discount_percent,
                    money(amounts.final_value)
                )?;
                if report.duration_minutes > 0.0 {
                    let time = EstimatedDuration {
                        work_minutes: report.duration_minutes,
                        buffer_minutes: 0.0,
                    };
                    write!(writer, " ({})", time.text())?;
                }
                writeln!(writer)?;
            }
        }
    }
    if draft.services.is_empty() {
        writeln!(writer, "  (none)")?;
    }

    let incomplete = recomputed.incomplete_count();
    if incomplete > 0 {
        writeln!(writer, "{incomplete} incomplete line(s) excluded from totals")?;
    }

    match &recomputed.duration_text {
        Some(text) => writeln!(writer, "Duration: {text}")?,
        None => writeln!(writer, "Duration: unknown")?,
    }

    let totals = recomputed.totals;
    let mode = match totals.mode {
        TotalsMode::Derived => "derived",
        TotalsMode::Manual => "manual",
    };
    writeln!(writer, "Totals ({mode}):")?;
    writeln!(writer, "  Services: {}", money(totals.services_value))?;
    writeln!(writer, "  Travel:   {}", money(totals.travel_price))?;
    writeln!(writer, "  Value:    {}", money(totals.value))?;
    writeln!(
        writer,
        "  Discount: {} ({})",
        money(totals.discount_value),
        totals.discount_percent
    )?;
    writeln!(writer, "  Final:    {}", money(totals.final_value))?;
    Ok(())
}
