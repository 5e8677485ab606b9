//! Stateless recompute of a draft.
//!
//! Runs resolver, duration estimator and pricing engine over a whole draft.
//! Called on every form edit; the caller owns debouncing and cancellation.

use serde::Serialize;

use crate::catalog::Catalog;
use crate::duration::{EstimatedDuration, job_duration, service_duration};
use crate::job::JobDraft;
use crate::pricing::{JobTotals, LineAmounts, apply_discount, job_totals, service_value};
use crate::service::LineStatus;
use crate::types::ValidationError;

/// Per-line outcome of a recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineReport {
    /// Position of the line in the draft, from zero.
    pub index: usize,
    #[serde(flatten)]
    pub status: LineStatus,
    /// `None` for incomplete lines, which stay out of every aggregate.
    pub amounts: Option<LineAmounts>,
    pub duration_minutes: f64,
}

/// Derived figures of a draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recomputed {
    pub lines: Vec<LineReport>,
    /// `None` when no line resolved a variation.
    pub duration: Option<EstimatedDuration>,
    pub duration_text: Option<String>,
    pub totals: JobTotals,
}

impl Recomputed {
    pub fn incomplete_count(&self) -> usize {
        self.lines.iter().filter(|l| l.status.is_incomplete()).count()
    }
}

/// Recomputes duration and totals for a draft.
///
/// Incomplete lines never abort the computation; they are reported and
/// skipped. Fails only on invalid money input (negative travel or value).
pub fn recompute(draft: &JobDraft, catalog: &Catalog) -> Result<Recomputed, ValidationError> {
    let lines: Vec<LineReport> = draft
        .services
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let status = line.status(catalog);
            let (amounts, duration_minutes) = match &status {
                LineStatus::Incomplete(_) => (None, 0.0),
                LineStatus::Resolved { variation } => (
                    service_value(line, Some(variation))
                        .map(|value| apply_discount(value, line.discount_percent)),
                    service_duration(line, Some(variation)),
                ),
                LineStatus::Manual => (
                    service_value(line, None)
                        .map(|value| apply_discount(value, line.discount_percent)),
                    0.0,
                ),
            };
            LineReport {
                index,
                status,
                amounts,
                duration_minutes,
            }
        })
        .collect();

    let amounts: Vec<LineAmounts> = lines.iter().filter_map(|l| l.amounts).collect();
    let totals = job_totals(&amounts, draft.travel_price(), &draft.manual_totals())?;
    let duration = job_duration(&draft.services, catalog);

    tracing::debug!(
        lines = lines.len(),
        incomplete = lines.len() - amounts.len(),
        mode = ?totals.mode,
        minutes = ?duration.map(|d| d.total_minutes()),
        "recomputed draft"
    );

    Ok(Recomputed {
        duration_text: duration.map(|d| d.text()),
        lines,
        duration,
        totals,
    })
}
