//! Canonical domain types and boundary normalization.
//!
//! Raw labels coming from forms and the REST backend are loosely typed
//! ("Argiloso", "ARGILA", "em execução", ...). They are folded into the
//! enums below exactly once, when input enters the system. Computation code
//! never looks at raw strings again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A discount percentage outside \[0, 100\].
    #[error("discount must be between 0 and 100, got {value}")]
    DiscountOutOfRange { value: Decimal },

    /// A money amount that must not be negative.
    #[error("{field} cannot be negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    /// Diameter outside the catalog grid (25..=120 in steps of 5).
    #[error("diameter must be one of 25, 30, ..., 120 mm, got {value}")]
    InvalidDiameter { value: u32 },

    /// Unrecognized soil type label.
    #[error("unknown soil type: {value}")]
    UnknownSoilType { value: String },

    /// Unrecognized access label.
    #[error("unknown access: {value}")]
    UnknownAccess { value: String },

    /// Unrecognized job status label.
    #[error("unknown job status: {value}")]
    UnknownStatus { value: String },

    /// Unrecognized document kind label.
    #[error("unknown document kind: {value}")]
    UnknownKind { value: String },

    /// Execution time per unit must be a finite, non-negative number.
    #[error("execution time per unit must be finite and non-negative, got {value}")]
    InvalidExecutionTime { value: f64 },

    /// The same (diameter, soil, access) triple appears twice in one catalog item.
    #[error("catalog item {item} has more than one variation for {key}")]
    DuplicateVariation { item: String, key: String },

    /// A date range whose end precedes its start.
    #[error("date range end {end} is before start {start}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    /// A date range spanning too many days.
    #[error("date range spans {days} days, at most {max} allowed")]
    DateRangeTooLong { days: i64, max: i64 },

    /// A field required when saving a job or budget is missing.
    #[error("{field} is required to save")]
    MissingField { field: &'static str },

    /// A job or budget saved without any service line.
    #[error("at least one service line is required to save")]
    NoServices,

    /// A service line still missing diameter, soil, access, quantity or depth.
    #[error("service line {index} is incomplete")]
    IncompleteService { index: usize },

    /// A planned date/time that could not be parsed.
    #[error("invalid date/time: {value} (expected YYYY-MM-DDTHH:MM)")]
    InvalidDateTime { value: String },
}

/// Folds a free-form label into a comparable key.
///
/// Trims, lower-cases, strips Portuguese diacritics and maps spaces and dashes
/// to underscores, so `"Em Execução"` and `"em-execucao"` fold to the same key.
pub(crate) fn fold_label(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

/// Parses a planned date/time as sent by forms and the job API.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, the same with a space separator, and
/// RFC 3339 with an offset. Offsets are dropped: scheduling works on the
/// local wall clock the operator typed.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, ValidationError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    let trimmed = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .ok_or_else(|| ValidationError::InvalidDateTime {
            value: raw.to_string(),
        })
}

/// Lenient serde adapter for optional planned date/times.
pub mod lenient_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_datetime(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Generates a canonical label enum with lenient parsing and strict output.
///
/// Serialization always writes the canonical label; deserialization accepts
/// any synonym listed for the variant.
macro_rules! define_label_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $error:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $canonical:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical label used for storage and output.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $canonical,)+
                }
            }

            /// Parses a label, returning `None` for anything unrecognized.
            pub fn normalize(raw: &str) -> Option<Self> {
                match fold_label(raw).as_str() {
                    $($canonical $(| $alias)* => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::normalize(s).ok_or_else(|| ValidationError::$error {
                    value: s.to_string(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_label_enum!(
    /// Soil classification of a drilling site.
    SoilType, UnknownSoilType {
        Argiloso => "argiloso" | "argila" | "argilosa" | "clay",
        Arenoso => "arenoso" | "areia" | "arenosa" | "sand" | "sandy",
        Rochoso => "rochoso" | "rocha" | "rochosa" | "rock" | "rocky",
        Misturado => "misturado" | "misturada" | "misto" | "mista" | "mixed",
        Outro => "outro" | "outros" | "outra" | "other",
    }
);

define_label_enum!(
    /// How easily equipment reaches the drilling site.
    Access, UnknownAccess {
        Livre => "livre" | "free",
        Limitado => "limitado" | "limitada" | "limited",
        Restrito => "restrito" | "restrita" | "restricted",
    }
);

define_label_enum!(
    /// Lifecycle status of a job.
    JobStatus, UnknownStatus {
        Pendente => "pendente" | "pending",
        EmExecucao => "em_execucao" | "emexecucao" | "execucao" | "in_progress",
        Concluida => "concluida" | "concluido" | "completed" | "done",
        Cancelada => "cancelada" | "cancelado" | "cancelled" | "canceled",
    }
);

impl JobStatus {
    /// Whether a job in this status holds its team's time.
    ///
    /// Completed and cancelled jobs never occupy a slot.
    #[must_use]
    pub const fn occupies_team(self) -> bool {
        matches!(self, Self::Pendente | Self::EmExecucao)
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Pendente
    }
}

/// Whether a document is a scheduled job or a budget (quote).
///
/// Budgets share the job shape but never book a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    #[default]
    #[serde(alias = "servico", alias = "ordem")]
    Job,
    #[serde(alias = "orcamento")]
    Budget,
}

impl JobKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Budget => "budget",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_label(s).as_str() {
            "job" | "servico" | "ordem" => Ok(Self::Job),
            "budget" | "orcamento" => Ok(Self::Budget),
            _ => Err(ValidationError::UnknownKind {
                value: s.to_string(),
            }),
        }
    }
}

/// Drilling diameter in millimetres, restricted to the catalog grid.
///
/// Valid values are 25, 30, ..., 120. There is no interpolation: any other
/// value is rejected (catalog import) or treated as missing (service lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Diameter(u32);

impl Diameter {
    pub const MIN_MM: u32 = 25;
    pub const MAX_MM: u32 = 120;
    pub const STEP_MM: u32 = 5;

    /// Creates a diameter, rejecting values off the grid.
    pub fn new(mm: u32) -> Result<Self, ValidationError> {
        if mm < Self::MIN_MM || mm > Self::MAX_MM || mm % Self::STEP_MM != 0 {
            return Err(ValidationError::InvalidDiameter { value: mm });
        }
        Ok(Self(mm))
    }

    /// Lenient constructor for form input: off-grid values become `None`.
    pub fn normalize(mm: u32) -> Option<Self> {
        Self::new(mm).ok()
    }

    #[must_use]
    pub const fn mm(self) -> u32 {
        self.0
    }

    /// Every diameter on the grid, ascending.
    pub fn grid() -> impl Iterator<Item = Self> {
        (Self::MIN_MM..=Self::MAX_MM)
            .step_by(Self::STEP_MM as usize)
            .map(Self)
    }
}

impl fmt::Display for Diameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm", self.0)
    }
}

impl TryFrom<u32> for Diameter {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Diameter> for u32 {
    fn from(d: Diameter) -> Self {
        d.0
    }
}

/// A discount percentage validated to lie in \[0, 100\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountPercent(Decimal);

impl DiscountPercent {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const FULL: Self = Self(Decimal::ONE_HUNDRED);

    /// Creates a discount, rejecting values outside \[0, 100\].
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ValidationError::DiscountOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Creates a discount, clamping to \[0, 100\].
    #[must_use]
    pub fn clamped(value: Decimal) -> Self {
        Self(value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
    }

    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for DiscountPercent {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DiscountPercent> for Decimal {
    fn from(d: DiscountPercent) -> Self {
        d.0
    }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.round_dp(2).normalize())
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Identifier of a job or budget, as issued by the job API.
    JobId, "job ID"
);

define_string_id!(
    /// Identifier of a field team.
    TeamId, "team ID"
);

define_string_id!(
    /// Identifier of a catalog item.
    CatalogItemId, "catalog item ID"
);

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn job_id_rejects_empty() {
        assert!(JobId::new("").is_err());
        assert!(JobId::new("   ").is_err());
        assert!(JobId::new("job-1").is_ok());
    }

    #[test]
    fn team_id_serde_rejects_empty() {
        let result: Result<TeamId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn team_id_serde_roundtrip() {
        let id = TeamId::new("equipe-a").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"equipe-a\"");
        let parsed: TeamId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    // ========== Label normalization ==========

    #[test]
    fn soil_type_accepts_casings_and_synonyms() {
        assert_eq!(SoilType::normalize("Argiloso"), Some(SoilType::Argiloso));
        assert_eq!(SoilType::normalize("  ARGILOSO "), Some(SoilType::Argiloso));
        assert_eq!(SoilType::normalize("argila"), Some(SoilType::Argiloso));
        assert_eq!(SoilType::normalize("Areia"), Some(SoilType::Arenoso));
        assert_eq!(SoilType::normalize("Rocha"), Some(SoilType::Rochoso));
        assert_eq!(SoilType::normalize("Misto"), Some(SoilType::Misturado));
        assert_eq!(SoilType::normalize("outros"), Some(SoilType::Outro));
        assert_eq!(SoilType::normalize("lama"), None);
    }

    #[test]
    fn status_folds_accents_and_separators() {
        assert_eq!(
            JobStatus::normalize("Em Execução"),
            Some(JobStatus::EmExecucao)
        );
        assert_eq!(
            JobStatus::normalize("em-execucao"),
            Some(JobStatus::EmExecucao)
        );
        assert_eq!(JobStatus::normalize("Concluída"), Some(JobStatus::Concluida));
        assert_eq!(JobStatus::normalize("cancelado"), Some(JobStatus::Cancelada));
    }

    #[test]
    fn only_open_statuses_occupy_team() {
        assert!(JobStatus::Pendente.occupies_team());
        assert!(JobStatus::EmExecucao.occupies_team());
        assert!(!JobStatus::Concluida.occupies_team());
        assert!(!JobStatus::Cancelada.occupies_team());
    }

    #[test]
    fn labels_serialize_canonically() {
        let json = serde_json::to_string(&JobStatus::EmExecucao).unwrap();
        assert_eq!(json, "\"em_execucao\"");
        let parsed: Access = serde_json::from_str("\"Limitada\"").unwrap();
        assert_eq!(parsed, Access::Limitado);
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, "\"limitado\"");
    }

    #[test]
    fn unknown_label_errors() {
        let err = "pantano".parse::<SoilType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown soil type: pantano");
        assert!("".parse::<Access>().is_err());
    }

    #[test]
    fn canonical_labels_roundtrip() {
        for soil in SoilType::ALL {
            assert_eq!(soil.as_str().parse::<SoilType>().unwrap(), *soil);
        }
        for access in Access::ALL {
            assert_eq!(access.as_str().parse::<Access>().unwrap(), *access);
        }
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn job_kind_accepts_portuguese_aliases() {
        let kind: JobKind = serde_json::from_str("\"orcamento\"").unwrap();
        assert_eq!(kind, JobKind::Budget);
        assert_eq!("Orçamento".parse::<JobKind>().unwrap(), JobKind::Budget);
        assert_eq!(JobKind::default(), JobKind::Job);
    }

    // ========== Date/time parsing ==========

    #[test]
    fn parse_datetime_accepts_form_and_api_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-05-01T09:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-05-01T09:00:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-05-01 09:00").unwrap(), expected);
        assert_eq!(parse_datetime("2024-05-01T09:00:00-03:00").unwrap(), expected);
    }

    #[test]
    fn parse_datetime_rejects_date_only() {
        assert_eq!(
            parse_datetime("2024-05-01"),
            Err(ValidationError::InvalidDateTime {
                value: "2024-05-01".to_string()
            })
        );
        assert!(parse_datetime("tomorrow").is_err());
    }

    // ========== Diameter ==========

    #[test]
    fn diameter_grid_has_twenty_entries() {
        let grid: Vec<u32> = Diameter::grid().map(Diameter::mm).collect();
        assert_eq!(grid.len(), 20);
        assert_eq!(grid.first(), Some(&25));
        assert_eq!(grid.last(), Some(&120));
    }

    #[test]
    fn diameter_rejects_off_grid_values() {
        assert!(Diameter::new(30).is_ok());
        assert_eq!(
            Diameter::new(33),
            Err(ValidationError::InvalidDiameter { value: 33 })
        );
        assert!(Diameter::new(20).is_err());
        assert!(Diameter::new(125).is_err());
        assert_eq!(Diameter::normalize(33), None);
    }

    #[test]
    fn diameter_deserialize_validates() {
        let parsed: Diameter = serde_json::from_str("45").unwrap();
        assert_eq!(parsed.mm(), 45);
        assert!(serde_json::from_str::<Diameter>("47").is_err());
    }

    // ========== DiscountPercent ==========

    #[test]
    fn discount_validates_range() {
        assert!(DiscountPercent::new(dec!(0)).is_ok());
        assert!(DiscountPercent::new(dec!(100)).is_ok());
        assert_eq!(
            DiscountPercent::new(dec!(-1)),
            Err(ValidationError::DiscountOutOfRange { value: dec!(-1) })
        );
        assert!(DiscountPercent::new(dec!(100.01)).is_err());
    }

    #[test]
    fn discount_clamped_handles_edges() {
        assert_eq!(DiscountPercent::clamped(dec!(-5)).value(), dec!(0));
        assert_eq!(DiscountPercent::clamped(dec!(150)).value(), dec!(100));
        assert_eq!(DiscountPercent::clamped(dec!(12.5)).value(), dec!(12.5));
    }

    #[test]
    fn discount_display_rounds_to_two_places() {
        let d = DiscountPercent::new(dec!(3.333333)).unwrap();
        assert_eq!(d.to_string(), "3.33%");
    }

    #[test]
    fn fold_label_normalizes() {
        assert_eq!(fold_label("  Em Execução "), "em_execucao");
        assert_eq!(fold_label("ROCHOSO"), "rochoso");
    }
}
