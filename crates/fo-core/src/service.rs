//! Service lines of a job or budget.
//!
//! [`ServiceLineInput`] is the raw shape a form or the job API sends.
//! [`ServiceLine`] is its normalized form: labels folded into canonical enums,
//! off-grid diameters and non-positive measures dropped to `None`, discount
//! validated. Every `ServiceLine` is deserialized through the input shape, so
//! there is exactly one normalization path.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ResolvedVariation};
use crate::types::{Access, CatalogItemId, Diameter, DiscountPercent, SoilType, ValidationError};

/// A service line exactly as received, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLineInput {
    #[serde(default)]
    pub catalog_ref: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub diameter: Option<u32>,
    #[serde(default)]
    pub soil_type: Option<String>,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub depth: Option<Decimal>,
    #[serde(default, alias = "value")]
    pub manual_value: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
}

/// A normalized service line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ServiceLineInput")]
pub struct ServiceLine {
    pub catalog_ref: Option<CatalogItemId>,
    pub description: Option<String>,
    pub diameter: Option<Diameter>,
    pub soil_type: Option<SoilType>,
    pub access: Option<Access>,
    pub quantity: Option<Decimal>,
    pub depth: Option<Decimal>,
    /// Value entered by hand, used only when no catalog variation resolves.
    /// The line still needs every measurement field; a manual value never
    /// rescues a line that lacks diameter, soil type, access, quantity or depth.
    pub manual_value: Option<Decimal>,
    pub discount_percent: DiscountPercent,
}

impl TryFrom<ServiceLineInput> for ServiceLine {
    type Error = ValidationError;

    fn try_from(input: ServiceLineInput) -> Result<Self, Self::Error> {
        let discount_percent = input
            .discount_percent
            .map(DiscountPercent::new)
            .transpose()?
            .unwrap_or_default();

        if let Some(value) = input.manual_value.filter(|v| *v < Decimal::ZERO) {
            return Err(ValidationError::NegativeAmount {
                field: "manual value",
                value,
            });
        }

        let soil_type = input.soil_type.as_deref().and_then(|raw| {
            let parsed = SoilType::normalize(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                tracing::warn!(label = raw, "unrecognized soil type; line left incomplete");
            }
            parsed
        });
        let access = input.access.as_deref().and_then(|raw| {
            let parsed = Access::normalize(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                tracing::warn!(label = raw, "unrecognized access; line left incomplete");
            }
            parsed
        });

        Ok(Self {
            catalog_ref: input
                .catalog_ref
                .and_then(|id| CatalogItemId::new(id).ok()),
            description: input.description.filter(|d| !d.trim().is_empty()),
            diameter: input.diameter.and_then(Diameter::normalize),
            soil_type,
            access,
            quantity: input.quantity.filter(|q| *q > Decimal::ZERO),
            depth: input.depth.filter(|d| *d > Decimal::ZERO),
            manual_value: input.manual_value,
            discount_percent,
        })
    }
}

impl From<ServiceLine> for ServiceLineInput {
    fn from(line: ServiceLine) -> Self {
        Self {
            catalog_ref: line.catalog_ref.map(String::from),
            description: line.description,
            diameter: line.diameter.map(Diameter::mm),
            soil_type: line.soil_type.map(|s| s.as_str().to_string()),
            access: line.access.map(|a| a.as_str().to_string()),
            quantity: line.quantity,
            depth: line.depth,
            manual_value: line.manual_value,
            discount_percent: Some(line.discount_percent.value()),
        }
    }
}

/// Quantity and depth of a complete line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    pub quantity: Decimal,
    pub depth: Decimal,
}

impl Measure {
    /// Units of work: quantity times depth.
    pub fn units(self) -> Decimal {
        self.quantity * self.depth
    }
}

/// Why a line cannot be priced or timed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IncompleteReason {
    /// One or more of diameter, soil type, access, quantity, depth is absent.
    MissingFields { fields: Vec<&'static str> },
    /// All fields are present but no variation matches and no manual value is set.
    NoVariation,
}

/// How a line's numbers were derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineStatus {
    /// Priced and timed from a catalog variation.
    Resolved { variation: ResolvedVariation },
    /// All fields present, priced from the manual value; contributes no
    /// execution time.
    Manual,
    /// Excluded from every aggregate.
    Incomplete(IncompleteReason),
}

impl LineStatus {
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete(_))
    }

    pub const fn variation(&self) -> Option<&ResolvedVariation> {
        match self {
            Self::Resolved { variation } => Some(variation),
            _ => None,
        }
    }
}

impl ServiceLine {
    /// Names of the required fields still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.diameter.is_none() {
            missing.push("diameter");
        }
        if self.soil_type.is_none() {
            missing.push("soilType");
        }
        if self.access.is_none() {
            missing.push("access");
        }
        if self.quantity.is_none() {
            missing.push("quantity");
        }
        if self.depth.is_none() {
            missing.push("depth");
        }
        missing
    }

    /// Quantity and depth, if both are present and positive.
    pub fn measure(&self) -> Option<Measure> {
        Some(Measure {
            quantity: self.quantity?,
            depth: self.depth?,
        })
    }

    /// Whether every required field is present.
    pub fn has_required_fields(&self) -> bool {
        self.diameter.is_some()
            && self.soil_type.is_some()
            && self.access.is_some()
            && self.measure().is_some()
    }

    /// Resolves this line's variation through the catalog.
    pub fn variation(&self, catalog: &Catalog) -> Option<ResolvedVariation> {
        catalog.resolve(
            self.catalog_ref.as_ref(),
            self.diameter,
            self.soil_type,
            self.access,
        )
    }

    /// Classifies the line against the catalog.
    pub fn status(&self, catalog: &Catalog) -> LineStatus {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return LineStatus::Incomplete(IncompleteReason::MissingFields { fields: missing });
        }
        match (self.variation(catalog), self.manual_value) {
            (Some(variation), _) => LineStatus::Resolved { variation },
            (None, Some(_)) => LineStatus::Manual,
            (None, None) => LineStatus::Incomplete(IncompleteReason::NoVariation),
        }
    }
}
