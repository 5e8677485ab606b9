//! Duration estimator.
//!
//! Execution time of a line is `quantity * depth * executionTimePerUnit`.
//! A job's estimate is the sum over lines with a resolved variation plus a
//! fixed setup buffer. Totals stay unrounded `f64` minutes until they are
//! displayed or persisted.

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::catalog::{Catalog, ResolvedVariation};
use crate::service::ServiceLine;

/// Setup/transition time added once per job, in minutes.
pub const SETUP_BUFFER_MINUTES: f64 = 30.0;

/// Estimated duration of a job, buffer included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedDuration {
    /// Sum of line execution times, unrounded.
    pub work_minutes: f64,
    /// Setup buffer applied (zero when there is no work).
    pub buffer_minutes: f64,
}

impl EstimatedDuration {
    /// Builds an estimate from summed work minutes, applying the buffer rule.
    pub fn from_work(work_minutes: f64) -> Self {
        let buffer_minutes = if work_minutes > 0.0 {
            SETUP_BUFFER_MINUTES
        } else {
            0.0
        };
        Self {
            work_minutes,
            buffer_minutes,
        }
    }

    /// Rehydrates a persisted estimate (already rounded, buffer included).
    pub fn from_stored(total_minutes: u32) -> Self {
        Self {
            work_minutes: f64::from(total_minutes),
            buffer_minutes: 0.0,
        }
    }

    pub fn total_minutes(&self) -> f64 {
        self.work_minutes + self.buffer_minutes
    }

    /// Total rounded to whole minutes, for display and persistence.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded_minutes(&self) -> u32 {
        let total = self.total_minutes().round();
        if total <= 0.0 {
            0
        } else if total >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            total as u32
        }
    }

    /// Human-readable duration, e.g. `"2h 30min"`.
    pub fn text(&self) -> String {
        format_duration(self.rounded_minutes())
    }
}

/// Formats whole minutes as `"Xh Ymin"`, `"Xh"` or `"Ymin"`.
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}min"),
    }
}

/// Execution time of one line, in minutes.
///
/// Zero when the variation is absent or the line has no positive
/// quantity and depth.
pub fn service_duration(line: &ServiceLine, variation: Option<&ResolvedVariation>) -> f64 {
    let (Some(variation), Some(measure)) = (variation, line.measure()) else {
        return 0.0;
    };
    let units = measure.units().to_f64().unwrap_or(0.0);
    if units <= 0.0 {
        return 0.0;
    }
    units * variation.execution_time_per_unit
}

/// Estimated duration of a set of lines.
///
/// Returns `None` when no line resolves a variation: that is "no data",
/// distinct from a legitimately zero estimate.
pub fn job_duration(lines: &[ServiceLine], catalog: &Catalog) -> Option<EstimatedDuration> {
    let mut any_resolved = false;
    let mut work = 0.0;
    for line in lines {
        let Some(variation) = line.variation(catalog) else {
            continue;
        };
        if line.measure().is_none() {
            continue;
        }
        any_resolved = true;
        work += service_duration(line, Some(&variation));
    }
    any_resolved.then(|| EstimatedDuration::from_work(work))
}
