//! Pricing engine.
//!
//! Pure money arithmetic in `rust_decimal` - no catalog or storage access
//! beyond the resolved variation handed in. Values are never rounded here;
//! [`round_money`] is applied when amounts are displayed or persisted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::catalog::ResolvedVariation;
use crate::service::ServiceLine;
use crate::types::{DiscountPercent, ValidationError};

/// Round to the given decimal places using banker's rounding.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use fo_core::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Value, discount and final value of one service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAmounts {
    pub value: Decimal,
    pub discount_percent: DiscountPercent,
    pub discount_value: Decimal,
    pub final_value: Decimal,
}

impl LineAmounts {
    /// Amounts rounded to cents, as they are persisted.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            value: round_money(self.value, 2),
            discount_percent: self.discount_percent,
            discount_value: round_money(self.discount_value, 2),
            final_value: round_money(self.final_value, 2),
        }
    }
}

/// Value of a service line.
///
/// `quantity * depth * price` when a variation resolves; otherwise the
/// manual value, which covers legacy and non-catalog services. `None` when
/// neither is available.
pub fn service_value(line: &ServiceLine, variation: Option<&ResolvedVariation>) -> Option<Decimal> {
    match (variation, line.measure()) {
        (Some(variation), Some(measure)) => Some(measure.units() * variation.price),
        _ => line.manual_value,
    }
}

/// Applies a discount percentage to a value.
///
/// Fails when the percentage lies outside \[0, 100\].
pub fn service_final(value: Decimal, discount_percent: Decimal) -> Result<LineAmounts, ValidationError> {
    let discount = DiscountPercent::new(discount_percent)?;
    Ok(apply_discount(value, discount))
}

pub(crate) fn apply_discount(value: Decimal, discount: DiscountPercent) -> LineAmounts {
    let discount_value = value * discount.value() / Decimal::ONE_HUNDRED;
    LineAmounts {
        value,
        discount_percent: discount,
        discount_value,
        final_value: value - discount_value,
    }
}

/// Whether the job-level value and discount were derived from the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsMode {
    /// At least one line carries a value; top-level fields are read-only.
    Derived,
    /// No line carries a value; the operator's figures are used.
    Manual,
}

/// Top-level figures entered by the operator.
///
/// Only consulted in [`TotalsMode::Manual`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManualTotals {
    /// Value before travel, as typed by the operator.
    pub value: Option<Decimal>,
    pub discount_percent: DiscountPercent,
}

/// Aggregated money figures of a job or budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTotals {
    pub mode: TotalsMode,
    /// Sum of line values (or the operator value in manual mode).
    pub services_value: Decimal,
    pub travel_price: Decimal,
    /// `services_value + travel_price`.
    pub value: Decimal,
    pub discount_value: Decimal,
    pub discount_percent: DiscountPercent,
    pub final_value: Decimal,
}

impl JobTotals {
    /// Totals rounded to cents, as they are persisted.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            services_value: round_money(self.services_value, 2),
            travel_price: round_money(self.travel_price, 2),
            value: round_money(self.value, 2),
            discount_value: round_money(self.discount_value, 2),
            final_value: round_money(self.final_value, 2),
            ..self
        }
    }
}

/// Aggregates line amounts and travel into job totals.
///
/// In derived mode the discount percentage is `sum(discount) / sum(value)`
/// over the lines. Travel is added to the value but never discounted.
pub fn job_totals(
    lines: &[LineAmounts],
    travel_price: Decimal,
    manual: &ManualTotals,
) -> Result<JobTotals, ValidationError> {
    if travel_price < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount {
            field: "travel price",
            value: travel_price,
        });
    }

    let services_value: Decimal = lines.iter().map(|l| l.value).sum();
    if services_value > Decimal::ZERO {
        let discount_value: Decimal = lines.iter().map(|l| l.discount_value).sum();
        let discount_percent =
            DiscountPercent::clamped(discount_value / services_value * Decimal::ONE_HUNDRED);
        let value = services_value + travel_price;
        return Ok(JobTotals {
            mode: TotalsMode::Derived,
            services_value,
            travel_price,
            value,
            discount_value,
            discount_percent,
            final_value: value - discount_value,
        });
    }

    let base = manual.value.unwrap_or(Decimal::ZERO);
    if base < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount {
            field: "value",
            value: base,
        });
    }
    let discounted = apply_discount(base, manual.discount_percent);
    let value = base + travel_price;
    Ok(JobTotals {
        mode: TotalsMode::Manual,
        services_value: base,
        travel_price,
        value,
        discount_value: discounted.discount_value,
        discount_percent: manual.discount_percent,
        final_value: value - discounted.discount_value,
    })
}
