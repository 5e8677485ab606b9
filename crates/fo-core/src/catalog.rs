//! Catalog variation resolver.
//!
//! A catalog item carries a table of price variations keyed by the exact
//! triple (diameter, soil type, access). Lookup is an exact match only: there
//! is no interpolation across diameters and no fallback to a neighbouring
//! category. A miss is a normal outcome, reported as `None`.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Access, CatalogItemId, Diameter, SoilType, ValidationError};

/// The exact key a price variation is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariationKey {
    pub diameter: Diameter,
    pub soil_type: SoilType,
    pub access: Access,
}

impl std::fmt::Display for VariationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.diameter, self.soil_type, self.access)
    }
}

/// One row of a catalog item's price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceVariation {
    pub diameter: Diameter,
    pub soil_type: SoilType,
    pub access: Access,
    /// Price per unit (per metre drilled, per pile, ...).
    pub price: Decimal,
    /// Execution time per unit, in minutes.
    pub execution_time_per_unit: f64,
}

impl PriceVariation {
    pub const fn key(&self) -> VariationKey {
        VariationKey {
            diameter: self.diameter,
            soil_type: self.soil_type,
            access: self.access,
        }
    }

    pub const fn resolved(&self) -> ResolvedVariation {
        ResolvedVariation {
            price: self.price,
            execution_time_per_unit: self.execution_time_per_unit,
        }
    }
}

/// Price and time per unit for a matched variation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVariation {
    pub price: Decimal,
    pub execution_time_per_unit: f64,
}

/// A service template with its price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: CatalogItemId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_variations: Vec<PriceVariation>,
}

impl CatalogItem {
    /// Checks the price table is usable for exact lookup.
    ///
    /// Rejects negative prices, non-finite or negative execution times, and
    /// duplicated triples (which would make the exact match ambiguous).
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for variation in &self.price_variations {
            if variation.price < Decimal::ZERO {
                return Err(ValidationError::NegativeAmount {
                    field: "price",
                    value: variation.price,
                });
            }
            let time = variation.execution_time_per_unit;
            if !time.is_finite() || time < 0.0 {
                return Err(ValidationError::InvalidExecutionTime { value: time });
            }
            let key = variation.key();
            if !seen.insert(key) {
                return Err(ValidationError::DuplicateVariation {
                    item: self.id.to_string(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Finds the variation matching the exact triple.
    pub fn resolve(
        &self,
        diameter: Option<Diameter>,
        soil_type: Option<SoilType>,
        access: Option<Access>,
    ) -> Option<ResolvedVariation> {
        resolve_variation(self, diameter, soil_type, access)
    }
}

/// Looks up the price variation for an exact (diameter, soil, access) triple.
///
/// Returns `None` when any input is absent or no variation matches exactly.
/// Never fails: a miss means the service line is still incomplete.
pub fn resolve_variation(
    item: &CatalogItem,
    diameter: Option<Diameter>,
    soil_type: Option<SoilType>,
    access: Option<Access>,
) -> Option<ResolvedVariation> {
    let key = VariationKey {
        diameter: diameter?,
        soil_type: soil_type?,
        access: access?,
    };
    item.price_variations
        .iter()
        .find(|variation| variation.key() == key)
        .map(PriceVariation::resolved)
}

/// The catalog as read from the catalog API, keyed by item ID.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<CatalogItemId, CatalogItem>,
}

impl Catalog {
    /// Builds a catalog, validating every item.
    ///
    /// A later item with the same ID replaces an earlier one.
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Result<Self, ValidationError> {
        let mut map = HashMap::new();
        for item in items {
            item.validate()?;
            map.insert(item.id.clone(), item);
        }
        Ok(Self { items: map })
    }

    pub fn get(&self, id: &CatalogItemId) -> Option<&CatalogItem> {
        self.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items ordered by ID.
    pub fn items(&self) -> Vec<&CatalogItem> {
        let sorted: BTreeMap<_, _> = self.items.iter().collect();
        sorted.into_values().collect()
    }

    /// Resolves a variation through an optional catalog reference.
    ///
    /// An absent or unknown reference resolves to `None`, like any other miss.
    pub fn resolve(
        &self,
        catalog_ref: Option<&CatalogItemId>,
        diameter: Option<Diameter>,
        soil_type: Option<SoilType>,
        access: Option<Access>,
    ) -> Option<ResolvedVariation> {
        let item = self.items.get(catalog_ref?)?;
        resolve_variation(item, diameter, soil_type, access)
    }
}
