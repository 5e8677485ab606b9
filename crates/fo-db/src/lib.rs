//! Local store for catalog items, teams and jobs.
//!
//! Stands in for the catalog, job and team directory services so the core
//! can run against real data. Backed by `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Open one instance per command invocation.
//!
//! # Schema
//!
//! Catalog variations live in their own table keyed by the exact
//! `(item, diameter, soil_type, access)` triple, so a duplicate triple cannot
//! be stored. Jobs keep their full saved shape as JSON in `data`; the scalar
//! columns beside it (`team_id`, `planned_at`, `status`, ...) exist only for
//! filtering.
//!
//! Planned times are stored as `YYYY-MM-DDTHH:MM:SS` local wall-clock text,
//! so lexicographic order matches chronological order. Money is stored as
//! decimal TEXT, never as REAL.

use std::path::Path;
use std::str::FromStr;

use chrono::{Days, NaiveDateTime, SecondsFormat, Utc};
use fo_core::availability::DateRange;
use fo_core::{
    Access, Catalog, CatalogItem, CatalogItemId, Diameter, Job, JobId, PriceVariation, SoilType,
    Team, TeamId, ValidationError,
};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use thiserror::Error;

const PLANNED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored job payload could not be encoded or decoded.
    #[error("invalid job data for {job_id}")]
    JobData {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stored row violates a domain rule.
    #[error("invalid {table} record {id}: {source}")]
    InvalidRecord {
        table: &'static str,
        id: String,
        #[source]
        source: ValidationError,
    },
    /// A stored decimal could not be parsed.
    #[error("invalid amount in {table} record {id}: {value}")]
    InvalidAmount {
        table: &'static str,
        id: String,
        value: String,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Row counts shown by `fo status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub catalog_items: usize,
    pub price_variations: usize,
    pub teams: usize,
    pub jobs: usize,
    pub budgets: usize,
    /// Scheduled jobs still pendente or em execução.
    pub open_jobs: usize,
}

/// Whether a save created a new job or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database, destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS catalog_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT ''
            );

            -- price: decimal text; execution_time_per_unit: minutes
            CREATE TABLE IF NOT EXISTS price_variations (
                item_id TEXT NOT NULL,
                diameter INTEGER NOT NULL,
                soil_type TEXT NOT NULL,
                access TEXT NOT NULL,
                price TEXT NOT NULL,
                execution_time_per_unit REAL NOT NULL,
                PRIMARY KEY (item_id, diameter, soil_type, access),
                FOREIGN KEY (item_id) REFERENCES catalog_items(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS teams (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT ''
            );

            -- data: full saved job as JSON
            -- planned_at: local wall clock, 'YYYY-MM-DDTHH:MM:SS'
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                team_id TEXT,
                planned_at TEXT,
                estimated_duration_minutes INTEGER,
                final_value TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_team_planned ON jobs(team_id, planned_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_planned ON jobs(planned_at);
            ",
        )?;
        Ok(())
    }

    // ========== Catalog ==========

    /// Inserts or replaces catalog items with their full variation tables.
    ///
    /// Items are validated first; an invalid item aborts the whole batch.
    pub fn upsert_catalog_items(&mut self, items: &[CatalogItem]) -> Result<usize, DbError> {
        for item in items {
            item.validate().map_err(|source| DbError::InvalidRecord {
                table: "catalog_items",
                id: item.id.to_string(),
                source,
            })?;
        }
        let tx = self.conn.transaction()?;
        {
            let mut upsert_item = tx.prepare(
                "
                INSERT INTO catalog_items (id, name, category) VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name, category = excluded.category
                ",
            )?;
            let mut clear_variations = tx.prepare("DELETE FROM price_variations WHERE item_id = ?")?;
            let mut insert_variation = tx.prepare(
                "
                INSERT INTO price_variations
                (item_id, diameter, soil_type, access, price, execution_time_per_unit)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for item in items {
                upsert_item.execute(params![item.id.as_str(), item.name, item.category])?;
                clear_variations.execute(params![item.id.as_str()])?;
                for variation in &item.price_variations {
                    insert_variation.execute(params![
                        item.id.as_str(),
                        variation.diameter.mm(),
                        variation.soil_type.as_str(),
                        variation.access.as_str(),
                        variation.price.to_string(),
                        variation.execution_time_per_unit,
                    ])?;
                }
            }
        }
        tx.commit()?;
        tracing::info!(items = items.len(), "catalog items stored");
        Ok(items.len())
    }

    /// Loads the whole catalog.
    pub fn load_catalog(&self) -> Result<Catalog, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, category FROM catalog_items ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut items = Vec::new();
        for row in rows {
            let (id, name, category) = row?;
            let price_variations = self.load_variations(&id)?;
            let id = CatalogItemId::new(id.clone()).map_err(|source| DbError::InvalidRecord {
                table: "catalog_items",
                id,
                source,
            })?;
            items.push(CatalogItem {
                id,
                name,
                category,
                price_variations,
            });
        }
        Catalog::new(items).map_err(|source| DbError::InvalidRecord {
            table: "catalog_items",
            id: String::from("*"),
            source,
        })
    }

    fn load_variations(&self, item_id: &str) -> Result<Vec<PriceVariation>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT diameter, soil_type, access, price, execution_time_per_unit
            FROM price_variations
            WHERE item_id = ?
            ORDER BY diameter ASC, soil_type ASC, access ASC
            ",
        )?;
        let rows = stmt.query_map(params![item_id], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;
        let invalid = |source| DbError::InvalidRecord {
            table: "price_variations",
            id: item_id.to_string(),
            source,
        };
        let mut variations = Vec::new();
        for row in rows {
            let (diameter, soil_type, access, price, execution_time_per_unit) = row?;
            variations.push(PriceVariation {
                diameter: Diameter::new(diameter).map_err(invalid)?,
                soil_type: SoilType::from_str(&soil_type).map_err(invalid)?,
                access: Access::from_str(&access).map_err(invalid)?,
                price: parse_amount(&price, "price_variations", item_id)?,
                execution_time_per_unit,
            });
        }
        Ok(variations)
    }

    // ========== Teams ==========

    /// Inserts or renames teams.
    pub fn upsert_teams(&mut self, teams: &[Team]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO teams (id, name) VALUES (?, ?)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
                ",
            )?;
            for team in teams {
                stmt.execute(params![team.id.as_str(), team.name])?;
            }
        }
        tx.commit()?;
        Ok(teams.len())
    }

    /// Lists the team directory ordered by ID.
    pub fn list_teams(&self) -> Result<Vec<Team>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM teams ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut teams = Vec::new();
        for row in rows {
            let (id, name) = row?;
            let id = TeamId::new(id.clone()).map_err(|source| DbError::InvalidRecord {
                table: "teams",
                id,
                source,
            })?;
            teams.push(Team { id, name });
        }
        Ok(teams)
    }

    // ========== Jobs ==========

    /// Inserts or replaces a batch of saved jobs.
    pub fn upsert_jobs(&mut self, jobs: &[Job]) -> Result<usize, DbError> {
        let now = timestamp_now();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_JOB)?;
            for job in jobs {
                let row = JobRow::from_job(job)?;
                stmt.execute(params![
                    row.id,
                    row.kind,
                    row.status,
                    row.team_id,
                    row.planned_at,
                    row.estimated_duration_minutes,
                    row.final_value,
                    row.data,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(jobs.len())
    }

    /// Saves one job, reporting whether it already existed.
    pub fn save_job(&mut self, job: &Job) -> Result<SaveOutcome, DbError> {
        let existed = self.job_exists(&job.id)?;
        self.upsert_jobs(std::slice::from_ref(job))?;
        let outcome = if existed {
            SaveOutcome::Updated
        } else {
            SaveOutcome::Created
        };
        tracing::info!(job = %job.id, kind = %job.kind, ?outcome, "job saved");
        Ok(outcome)
    }

    fn job_exists(&self, id: &JobId) -> Result<bool, DbError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM jobs WHERE id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Fetches a saved job by ID.
    pub fn get_job(&self, id: &JobId) -> Result<Option<Job>, DbError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM jobs WHERE id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|data| decode_job(id.as_str(), &data)).transpose()
    }

    /// Lists every stored job and budget, by planned time then ID.
    pub fn list_jobs(&self) -> Result<Vec<Job>, DbError> {
        self.query_jobs(
            "SELECT id, data FROM jobs ORDER BY planned_at ASC, id ASC",
            &[],
        )
    }

    /// Lists jobs planned in the range, plus the day before it.
    ///
    /// The extra day lets callers see bookings that run past midnight into
    /// the range. Unscheduled jobs are never returned.
    pub fn list_jobs_in_range(&self, range: &DateRange) -> Result<Vec<Job>, DbError> {
        let (from, until) = planned_bounds(range);
        self.query_jobs(
            "
            SELECT id, data FROM jobs
            WHERE planned_at >= ? AND planned_at < ?
            ORDER BY planned_at ASC, id ASC
            ",
            &[&from, &until],
        )
    }

    /// Lists one team's jobs planned in the range, plus the day before it.
    pub fn list_team_jobs(&self, team: &TeamId, range: &DateRange) -> Result<Vec<Job>, DbError> {
        let (from, until) = planned_bounds(range);
        self.query_jobs(
            "
            SELECT id, data FROM jobs
            WHERE team_id = ? AND planned_at >= ? AND planned_at < ?
            ORDER BY planned_at ASC, id ASC
            ",
            &[&team.as_str(), &from, &until],
        )
    }

    fn query_jobs(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Job>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut jobs = Vec::new();
        for row in rows {
            let (id, data) = row?;
            jobs.push(decode_job(&id, &data)?);
        }
        Ok(jobs)
    }

    /// Row counts per table.
    pub fn counts(&self) -> Result<StoreCounts, DbError> {
        let count = |sql: &str| -> Result<usize, DbError> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };
        Ok(StoreCounts {
            catalog_items: count("SELECT COUNT(*) FROM catalog_items")?,
            price_variations: count("SELECT COUNT(*) FROM price_variations")?,
            teams: count("SELECT COUNT(*) FROM teams")?,
            jobs: count("SELECT COUNT(*) FROM jobs WHERE kind = 'job'")?,
            budgets: count("SELECT COUNT(*) FROM jobs WHERE kind = 'budget'")?,
            open_jobs: count(
                "SELECT COUNT(*) FROM jobs WHERE kind = 'job' AND status IN ('pendente', 'em_execucao')",
            )?,
        })
    }
}

const UPSERT_JOB: &str = "
    INSERT INTO jobs
    (id, kind, status, team_id, planned_at, estimated_duration_minutes, final_value, data, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        kind = excluded.kind,
        status = excluded.status,
        team_id = excluded.team_id,
        planned_at = excluded.planned_at,
        estimated_duration_minutes = excluded.estimated_duration_minutes,
        final_value = excluded.final_value,
        data = excluded.data,
        updated_at = excluded.updated_at
";

/// Column values of a job row.
struct JobRow {
    id: String,
    kind: &'static str,
    status: &'static str,
    team_id: Option<String>,
    planned_at: Option<String>,
    estimated_duration_minutes: Option<u32>,
    final_value: String,
    data: String,
}

impl JobRow {
    fn from_job(job: &Job) -> Result<Self, DbError> {
        let data = serde_json::to_string(job).map_err(|source| DbError::JobData {
            job_id: job.id.to_string(),
            source,
        })?;
        Ok(Self {
            id: job.id.to_string(),
            kind: job.kind.as_str(),
            status: job.status.as_str(),
            team_id: job.team_ref.as_ref().map(ToString::to_string),
            planned_at: job.planned_at.map(format_planned_at),
            estimated_duration_minutes: job.estimated_duration_minutes,
            final_value: job.final_value.to_string(),
            data,
        })
    }
}

fn decode_job(id: &str, data: &str) -> Result<Job, DbError> {
    serde_json::from_str(data).map_err(|source| DbError::JobData {
        job_id: id.to_string(),
        source,
    })
}

fn parse_amount(raw: &str, table: &'static str, id: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(raw).map_err(|_| DbError::InvalidAmount {
        table,
        id: id.to_string(),
        value: raw.to_string(),
    })
}

fn format_planned_at(planned_at: NaiveDateTime) -> String {
    planned_at.format(PLANNED_AT_FORMAT).to_string()
}

/// Half-open text bounds covering the range and the day before it.
fn planned_bounds(range: &DateRange) -> (String, String) {
    let widened = range.with_previous_day();
    let from = widened.start().and_time(chrono::NaiveTime::MIN);
    let until = range
        .end()
        .checked_add_days(Days::new(1))
        .unwrap_or_else(|| range.end())
        .and_time(chrono::NaiveTime::MIN);
    (format_planned_at(from), format_planned_at(until))
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use chrono::NaiveDate;
    use fo_core::{
        JobDraft, JobKind, JobStatus, ServiceLine, ServiceLineInput, parse_datetime, recompute, snapshot,
    };
    use rust_decimal_macros::dec;

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    fn item() -> CatalogItem {
        CatalogItem {
            id: CatalogItemId::new("estaca").unwrap(),
            name: "Estaca hélice".to_string(),
            category: "fundacao".to_string(),
            price_variations: vec![
                PriceVariation {
                    diameter: Diameter::new(30).unwrap(),
                    soil_type: SoilType::Argiloso,
                    access: Access::Livre,
                    price: dec!(50.25),
                    execution_time_per_unit: 1.5,
                },
                PriceVariation {
                    diameter: Diameter::new(40).unwrap(),
                    soil_type: SoilType::Rochoso,
                    access: Access::Restrito,
                    price: dec!(120),
                    execution_time_per_unit: 4.0,
                },
            ],
        }
    }

    fn job(id: &str, team: Option<&str>, at: Option<&str>) -> Job {
        Job {
            id: JobId::new(id).unwrap(),
            kind: JobKind::Job,
            status: JobStatus::Pendente,
            team_ref: team.map(|t| TeamId::new(t).unwrap()),
            planned_at: at.map(|s| parse_datetime(s).unwrap()),
            services: Vec::new(),
            travel_distance_km: None,
            travel_price: dec!(0),
            travel_description: None,
            value: dec!(1000),
            discount_percent: fo_core::DiscountPercent::ZERO,
            discount_value: dec!(0),
            final_value: dec!(1000),
            estimated_duration_minutes: Some(90),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        assert!(Database::open_in_memory().is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "price_variations"),
            vec![
                "item_id",
                "diameter",
                "soil_type",
                "access",
                "price",
                "execution_time_per_unit",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "jobs"),
            vec![
                "id",
                "kind",
                "status",
                "team_id",
                "planned_at",
                "estimated_duration_minutes",
                "final_value",
                "data",
                "updated_at",
            ]
        );
        assert!(index_names(&db.conn, "jobs").contains("idx_jobs_team_planned"));
    }

    #[test]
    fn open_on_disk_is_reusable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fo.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.upsert_catalog_items(&[item()]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.load_catalog().unwrap().len(), 1);
    }

    // ========== Catalog ==========

    #[test]
    fn catalog_roundtrips_exact_amounts() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_catalog_items(&[item()]).unwrap();

        let catalog = db.load_catalog().unwrap();
        let stored = catalog.get(&CatalogItemId::new("estaca").unwrap()).unwrap();
        assert_eq!(stored, &item());
    }

    #[test]
    fn upsert_replaces_variation_table() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_catalog_items(&[item()]).unwrap();

        let mut updated = item();
        updated.price_variations.truncate(1);
        updated.price_variations[0].price = dec!(55);
        db.upsert_catalog_items(&[updated.clone()]).unwrap();

        let catalog = db.load_catalog().unwrap();
        assert_eq!(catalog.get(&updated.id), Some(&updated));
        assert_eq!(db.counts().unwrap().price_variations, 1);
    }

    #[test]
    fn invalid_item_is_rejected_before_writing() {
        let mut db = Database::open_in_memory().unwrap();
        let mut dup = item();
        dup.price_variations.push(dup.price_variations[0].clone());

        let err = db.upsert_catalog_items(&[dup]).unwrap_err();
        assert!(matches!(err, DbError::InvalidRecord { table: "catalog_items", .. }));
        assert_eq!(db.counts().unwrap().catalog_items, 0);
    }

    // ========== Teams ==========

    #[test]
    fn teams_upsert_and_list() {
        let mut db = Database::open_in_memory().unwrap();
        let teams = vec![
            Team {
                id: TeamId::new("b").unwrap(),
                name: "Equipe B".to_string(),
            },
            Team {
                id: TeamId::new("a").unwrap(),
                name: "Equipe A".to_string(),
            },
        ];
        db.upsert_teams(&teams).unwrap();
        db.upsert_teams(&[Team {
            id: TeamId::new("a").unwrap(),
            name: "Equipe Alfa".to_string(),
        }])
        .unwrap();

        let listed = db.list_teams().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Equipe Alfa");
        assert_eq!(listed[1].id.as_str(), "b");
    }

    // ========== Jobs ==========

    #[test]
    fn save_job_reports_created_then_updated() {
        let mut db = Database::open_in_memory().unwrap();
        let mut j = job("j1", Some("a"), Some("2024-05-01T08:00"));
        assert_eq!(db.save_job(&j).unwrap(), SaveOutcome::Created);

        j.status = JobStatus::EmExecucao;
        assert_eq!(db.save_job(&j).unwrap(), SaveOutcome::Updated);

        let stored = db.get_job(&j.id).unwrap().unwrap();
        assert_eq!(stored, j);
        assert!(db.get_job(&JobId::new("missing").unwrap()).unwrap().is_none());
    }

    #[test]
    fn saved_job_keeps_amounts_after_catalog_reprice() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_catalog_items(&[item()]).unwrap();
        let line = ServiceLine::try_from(ServiceLineInput {
            catalog_ref: Some("estaca".to_string()),
            diameter: Some(30),
            soil_type: Some("argiloso".to_string()),
            access: Some("livre".to_string()),
            quantity: Some(dec!(10)),
            depth: Some(dec!(2)),
            ..ServiceLineInput::default()
        })
        .unwrap();
        let draft = JobDraft {
            id: Some(JobId::new("j1").unwrap()),
            team_ref: Some(TeamId::new("a").unwrap()),
            planned_at: Some(parse_datetime("2024-05-01T08:00").unwrap()),
            services: vec![line],
            ..JobDraft::default()
        };
        let job = snapshot(&draft, &db.load_catalog().unwrap()).unwrap();
        db.save_job(&job).unwrap();

        let mut repriced = item();
        repriced.price_variations[0].price = dec!(80);
        repriced.price_variations[0].execution_time_per_unit = 3.0;
        db.upsert_catalog_items(&[repriced]).unwrap();

        let stored = db.get_job(&job.id).unwrap().unwrap();
        assert_eq!(stored.services[0].amounts.value, dec!(1005.00));
        assert_eq!(stored.final_value, dec!(1005.00));
        assert_eq!(stored.estimated_duration_minutes, Some(60));

        let fresh = recompute(&draft, &db.load_catalog().unwrap()).unwrap();
        assert_eq!(fresh.totals.final_value, dec!(1600));
        assert_eq!(fresh.duration_text.as_deref(), Some("1h 30min"));
    }

    #[test]
    fn team_jobs_filtered_by_team_and_range() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_jobs(&[
            job("early", Some("a"), Some("2024-04-29T08:00")),
            job("prev-evening", Some("a"), Some("2024-04-30T22:00")),
            job("in-range", Some("a"), Some("2024-05-01T08:00")),
            job("last-day", Some("a"), Some("2024-05-02T19:30")),
            job("after", Some("a"), Some("2024-05-03T06:00")),
            job("other-team", Some("b"), Some("2024-05-01T08:00")),
            job("unscheduled", Some("a"), None),
        ])
        .unwrap();

        let range = DateRange::new(day("2024-05-01"), day("2024-05-02")).unwrap();
        let ids: Vec<String> = db
            .list_team_jobs(&TeamId::new("a").unwrap(), &range)
            .unwrap()
            .into_iter()
            .map(|j| j.id.to_string())
            .collect();
        assert_eq!(ids, vec!["prev-evening", "in-range", "last-day"]);

        let all = db.list_jobs_in_range(&range).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn counts_split_jobs_and_budgets() {
        let mut db = Database::open_in_memory().unwrap();
        let mut budget = job("b1", None, None);
        budget.kind = JobKind::Budget;
        let mut done = job("j2", Some("a"), Some("2024-05-01T08:00"));
        done.status = JobStatus::Concluida;
        db.upsert_jobs(&[job("j1", Some("a"), Some("2024-05-01T08:00")), done, budget])
            .unwrap();

        let counts = db.counts().unwrap();
        assert_eq!(counts.jobs, 2);
        assert_eq!(counts.budgets, 1);
        assert_eq!(counts.open_jobs, 1);
    }

    #[test]
    fn corrupt_job_payload_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO jobs (id, kind, status, final_value, data, updated_at) VALUES ('x', 'job', 'pendente', '0', 'not json', '')",
                [],
            )
            .unwrap();
        let err = db.list_jobs().unwrap_err();
        assert!(matches!(err, DbError::JobData { .. }));
    }
}
