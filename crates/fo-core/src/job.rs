//! Jobs, budgets and the save snapshot.
//!
//! A [`JobDraft`] is what an editing session holds: loosely filled, recomputed
//! on every change. A [`Job`] is what gets persisted: every line's amounts and
//! the estimated duration frozen at save time, so later catalog price changes
//! never alter a saved document.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::pricing::{LineAmounts, ManualTotals};
use crate::recompute::recompute;
use crate::service::ServiceLine;
use crate::types::{DiscountPercent, JobId, JobKind, JobStatus, TeamId, ValidationError, lenient_datetime};

/// A field team from the team directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    #[serde(default)]
    pub name: String,
}

/// Distance and price quoted by the travel service for a job site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelQuote {
    pub distance_km: Decimal,
    pub travel_price: Decimal,
    #[serde(default)]
    pub travel_description: Option<String>,
}

/// A job or budget being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    /// Set when editing an existing job.
    #[serde(default)]
    pub id: Option<JobId>,
    #[serde(default)]
    pub kind: JobKind,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, alias = "team", alias = "teamId")]
    pub team_ref: Option<TeamId>,
    #[serde(default, alias = "plannedDate", with = "lenient_datetime")]
    pub planned_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub services: Vec<ServiceLine>,
    #[serde(default)]
    pub travel_distance_km: Option<Decimal>,
    #[serde(default)]
    pub travel_price: Option<Decimal>,
    #[serde(default)]
    pub travel_description: Option<String>,
    /// Operator-entered value, used only when no line carries a value.
    #[serde(default)]
    pub value: Option<Decimal>,
    /// Operator-entered discount, used only when no line carries a value.
    #[serde(default)]
    pub discount_percent: DiscountPercent,
}

impl JobDraft {
    pub fn manual_totals(&self) -> ManualTotals {
        ManualTotals {
            value: self.value,
            discount_percent: self.discount_percent,
        }
    }

    pub fn travel_price(&self) -> Decimal {
        self.travel_price.unwrap_or(Decimal::ZERO)
    }

    /// Copies a travel quote onto the draft. Travel is never discounted.
    pub fn apply_travel(&mut self, quote: &TravelQuote) {
        self.travel_distance_km = Some(quote.distance_km);
        self.travel_price = Some(quote.travel_price);
        self.travel_description.clone_from(&quote.travel_description);
    }

    /// Whether this draft would occupy a team once saved.
    pub fn books_team(&self) -> bool {
        self.kind == JobKind::Job && self.status.occupies_team()
    }
}

/// A service line with its amounts frozen at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedServiceLine {
    pub line: ServiceLine,
    pub amounts: LineAmounts,
}

/// A saved job or budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub kind: JobKind,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, alias = "team", alias = "teamId")]
    pub team_ref: Option<TeamId>,
    #[serde(default, alias = "plannedDate", with = "lenient_datetime")]
    pub planned_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub services: Vec<SavedServiceLine>,
    #[serde(default)]
    pub travel_distance_km: Option<Decimal>,
    #[serde(default)]
    pub travel_price: Decimal,
    #[serde(default)]
    pub travel_description: Option<String>,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub discount_percent: DiscountPercent,
    #[serde(default)]
    pub discount_value: Decimal,
    #[serde(default)]
    pub final_value: Decimal,
    /// Whole minutes, setup buffer included. `None` when nothing resolved.
    #[serde(default)]
    pub estimated_duration_minutes: Option<u32>,
}

impl Job {
    /// Turns a saved job back into an editable draft.
    ///
    /// Top-level figures are kept so manual-mode documents reopen unchanged.
    pub fn to_draft(&self) -> JobDraft {
        JobDraft {
            id: Some(self.id.clone()),
            kind: self.kind,
            status: self.status,
            team_ref: self.team_ref.clone(),
            planned_at: self.planned_at,
            services: self.services.iter().map(|s| s.line.clone()).collect(),
            travel_distance_km: self.travel_distance_km,
            travel_price: Some(self.travel_price),
            travel_description: self.travel_description.clone(),
            value: Some(self.value - self.travel_price),
            discount_percent: self.discount_percent,
        }
    }
}

/// A job that can occupy a team's time.
///
/// Lets the availability calculator work over stored jobs as well as test
/// fixtures or drafts without converting them first.
pub trait BookableJob {
    fn job_id(&self) -> &JobId;

    fn kind(&self) -> JobKind;

    fn status(&self) -> JobStatus;

    /// Team the job is assigned to, if any.
    fn team(&self) -> Option<&TeamId>;

    /// Planned start on the local wall clock.
    fn planned_at(&self) -> Option<NaiveDateTime>;

    /// Stored duration in whole minutes, buffer included.
    fn duration_minutes(&self) -> Option<u32>;
}

impl BookableJob for Job {
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
        self.team_ref.as_ref()
    }

    fn planned_at(&self) -> Option<NaiveDateTime> {
        self.planned_at
    }

    fn duration_minutes(&self) -> Option<u32> {
        self.estimated_duration_minutes
    }
}

/// Validates a draft and freezes it into a saveable [`Job`].
///
/// Requires an ID, at least one service line and no incomplete line. A
/// scheduled job (not a budget) also needs a team and a planned date. Line
/// amounts, totals and the duration are rounded and frozen here.
pub fn snapshot(draft: &JobDraft, catalog: &Catalog) -> Result<Job, ValidationError> {
    let id = draft
        .id
        .clone()
        .ok_or(ValidationError::MissingField { field: "id" })?;
    if draft.services.is_empty() {
        return Err(ValidationError::NoServices);
    }
    if draft.kind == JobKind::Job {
        if draft.team_ref.is_none() {
            return Err(ValidationError::MissingField { field: "team" });
        }
        if draft.planned_at.is_none() {
            return Err(ValidationError::MissingField {
                field: "plannedDate",
            });
        }
    }

    let recomputed = recompute(draft, catalog)?;
    let mut services = Vec::with_capacity(draft.services.len());
    for (line, report) in draft.services.iter().zip(&recomputed.lines) {
        let amounts = report
            .amounts
            .ok_or(ValidationError::IncompleteService {
                index: report.index + 1,
            })?;
        services.push(SavedServiceLine {
            line: line.clone(),
            amounts: amounts.rounded(),
        });
    }

    let totals = recomputed.totals.rounded();
    let estimated_duration_minutes = recomputed.duration.map(|d| d.rounded_minutes());
    tracing::debug!(
        job = %id,
        kind = %draft.kind,
        final_value = %totals.final_value,
        minutes = ?estimated_duration_minutes,
        "snapshot taken"
    );

    Ok(Job {
        id,
        kind: draft.kind,
        status: draft.status,
        team_ref: draft.team_ref.clone(),
        planned_at: draft.planned_at,
        services,
        travel_distance_km: draft.travel_distance_km,
        travel_price: totals.travel_price,
        travel_description: draft.travel_description.clone(),
        value: totals.value,
        discount_percent: totals.discount_percent,
        discount_value: totals.discount_value,
        final_value: totals.final_value,
        estimated_duration_minutes,
    })
}
