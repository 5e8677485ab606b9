//! Status command: what the local store holds and how fo is configured.

use std::io::Write;

use anyhow::Result;

use fo_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let counts = db.counts()?;

    writeln!(writer, "Field operations status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    match &config.travel_service_url {
        Some(url) => writeln!(writer, "Travel service: {url}")?,
        None => writeln!(writer, "Travel service: not configured")?,
    }

    if counts == fo_db::StoreCounts::default() {
        writeln!(writer, "Store is empty. Run 'fo import <file>' to load data.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "Catalog: {} items, {} price variations",
        counts.catalog_items, counts.price_variations
    )?;
    writeln!(writer, "Teams: {}", counts.teams)?;
    writeln!(writer, "Jobs: {} ({} open)", counts.jobs, counts.open_jobs)?;
    writeln!(writer, "Budgets: {}", counts.budgets)?;
    Ok(())
}
