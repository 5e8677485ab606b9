//! Shared utilities for CLI commands.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use fo_core::availability::SLOT_MINUTES;
use fo_core::{DateRange, TeamBooking, round_money};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Reads a JSON document from a file, or from stdin when the path is `-`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Writes a value as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("failed to serialize output")?;
    writeln!(writer)?;
    Ok(())
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {s}. Use YYYY-MM-DD (e.g., 2024-05-01)"))
}

/// Builds a date range from a start date and an optional inclusive end.
pub fn parse_range(from: &str, until: Option<&str>) -> Result<DateRange> {
    let start = parse_date(from)?;
    let end = until.map(parse_date).transpose()?.unwrap_or(start);
    Ok(DateRange::new(start, end)?)
}

/// Formats money with two decimal places.
pub fn money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount, 2))
}

/// One-line description of a booking, e.g. `job-1 08:00-10:00 (pendente)`.
pub fn booking_line(booking: &TeamBooking) -> String {
    let end = if booking.end.date() == booking.start.date() {
        booking.end.format("%H:%M").to_string()
    } else {
        booking.end.format("%Y-%m-%d %H:%M").to_string()
    };
    format!(
        "{} {}-{} ({})",
        booking.job_id,
        booking.start.format("%H:%M"),
        end,
        booking.status
    )
}

/// Merges consecutive grid ticks into `HH:MM-HH:MM` windows.
pub fn windows(times: &[NaiveTime]) -> String {
    let step = Duration::minutes(i64::from(SLOT_MINUTES));
    let mut spans: Vec<(NaiveTime, NaiveTime)> = Vec::new();
    for &time in times {
        match spans.last_mut() {
            Some((_, end)) if *end == time => *end = time + step,
            _ => spans.push((time, time + step)),
        }
    }
    spans
        .iter()
        .map(|(start, end)| format!("{}-{}", start.format("%H:%M"), end.format("%H:%M")))
        .collect::<Vec<_>>()
        .join(", ")
}
