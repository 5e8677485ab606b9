//! Import command for loading reference data into the local store.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use fo_core::{BookableJob, CatalogItem, Job, Team};
use fo_db::Database;

use super::util::read_json;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON file with `catalog`, `teams` and `jobs` arrays, or `-` for stdin.
    pub file: PathBuf,
}

/// Everything an import file may carry. Missing sections are skipped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFile {
    #[serde(default, alias = "catalogItems")]
    pub catalog: Vec<CatalogItem>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Counts of stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub catalog_items: usize,
    pub teams: usize,
    pub jobs: usize,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &ImportArgs) -> Result<ImportSummary> {
    let file: ImportFile = read_json(&args.file)?;
    let summary = import(db, &file)?;
    writeln!(
        writer,
        "Imported {} catalog items, {} teams, {} jobs",
        summary.catalog_items, summary.teams, summary.jobs
    )?;
    Ok(summary)
}

/// Stores the file's contents, catalog first so jobs can be recomputed later.
pub fn import(db: &mut Database, file: &ImportFile) -> Result<ImportSummary> {
    let catalog_items = db
        .upsert_catalog_items(&file.catalog)
        .context("failed to import catalog")?;
    let teams = db.upsert_teams(&file.teams).context("failed to import teams")?;

    let known: HashSet<_> = db
        .list_teams()
        .context("failed to list teams")?
        .into_iter()
        .map(|t| t.id)
        .collect();
    for job in &file.jobs {
        warn_if_unbookable(job, &known);
    }
    let jobs = db.upsert_jobs(&file.jobs).context("failed to import jobs")?;

    Ok(ImportSummary {
        catalog_items,
        teams,
        jobs,
    })
}

fn warn_if_unbookable(job: &Job, known: &HashSet<fo_core::TeamId>) {
    if let Some(team) = job.team().filter(|t| !known.contains(*t)) {
        tracing::warn!(job = %job.id, %team, "job references a team not in the directory");
    }
    let open = job.kind == fo_core::JobKind::Job && job.status.occupies_team();
    if open && job.planned_at.is_some() && job.estimated_duration_minutes.is_none() {
        tracing::warn!(job = %job.id, "job has no stored duration; it will hold a single slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fo_core::{CatalogItemId, JobId};

    const FIXTURE: &str = r#"{
        "catalog": [{
            "id": "estaca",
            "name": "Estaca hélice",
            "priceVariations": [
                {"diameter": 30, "soilType": "argiloso", "access": "livre", "price": "50.00", "executionTimePerUnit": 1.5},
                {"diameter": 40, "soilType": "arenoso", "access": "restrito", "price": 80, "executionTimePerUnit": 3}
            ]
        }],
        "teams": [{"id": "equipe-a", "name": "Equipe A"}],
        "jobs": [{
            "id": "job-1",
            "teamId": "equipe-a",
            "plannedDate": "2024-05-01T08:00:00",
            "finalValue": "900.00",
            "estimatedDurationMinutes": 120
        }]
    }"#;

    #[test]
    fn import_stores_every_section() {
        let mut db = Database::open_in_memory().unwrap();
        let file: ImportFile = serde_json::from_str(FIXTURE).unwrap();

        let summary = import(&mut db, &file).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                catalog_items: 1,
                teams: 1,
                jobs: 1,
            }
        );

        let catalog = db.load_catalog().unwrap();
        let item = catalog.get(&CatalogItemId::new("estaca").unwrap()).unwrap();
        assert_eq!(item.price_variations.len(), 2);

        let job = db.get_job(&JobId::new("job-1").unwrap()).unwrap().unwrap();
        assert_eq!(job.estimated_duration_minutes, Some(120));
    }

    #[test]
    fn import_accepts_partial_files() {
        let mut db = Database::open_in_memory().unwrap();
        let file: ImportFile =
            serde_json::from_str(r#"{"teams": [{"id": "equipe-b"}]}"#).unwrap();
        let summary = import(&mut db, &file).unwrap();
        assert_eq!(summary.teams, 1);
        assert_eq!(summary.catalog_items, 0);
    }

    #[test]
    fn duplicate_variation_aborts_import() {
        let mut db = Database::open_in_memory().unwrap();
        let file: ImportFile = serde_json::from_str(
            r#"{"catalog": [{"id": "x", "name": "X", "priceVariations": [
                {"diameter": 30, "soilType": "argiloso", "access": "livre", "price": 1, "executionTimePerUnit": 1},
                {"diameter": 30, "soilType": "argila", "access": "livre", "price": 2, "executionTimePerUnit": 1}
            ]}]}"#,
        )
        .unwrap();
        assert!(import(&mut db, &file).is_err());
        assert_eq!(db.counts().unwrap().catalog_items, 0);
    }

    #[test]
    fn run_reports_counts() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("import.json");
        std::fs::write(&path, FIXTURE).unwrap();
        let mut db = Database::open_in_memory().unwrap();

        let mut output = Vec::new();
        run(&mut output, &mut db, &ImportArgs { file: path }).unwrap();

        let output = String::from_utf8(output).unwrap();
        insta::assert_snapshot!(output, @"Imported 1 catalog items, 1 teams, 1 jobs");
    }
}
