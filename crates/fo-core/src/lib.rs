//! Scheduling and estimation core for field-service jobs.
//!
//! This crate contains the pure, side-effect-free logic for:
//! - Catalog: exact-match lookup of price/time variations
//! - Duration: per-line and per-job execution time with setup buffer
//! - Pricing: line and job values, discounts and travel
//! - Availability: per-team day grids and double-booking detection
//!
//! Raw input is normalized once, at the boundary, by [`ServiceLine`] and
//! [`JobDraft`] deserialization; everything downstream works on canonical
//! types.

pub mod availability;
pub mod catalog;
pub mod duration;
pub mod gate;
pub mod job;
pub mod pricing;
mod recompute;
pub mod service;
pub mod types;

pub use availability::{
    AvailabilityReport, DateRange, DaySlots, SLOTS_PER_DAY, TeamBooking, calendar,
    get_availability, team_availability,
};
pub use catalog::{Catalog, CatalogItem, PriceVariation, ResolvedVariation, resolve_variation};
pub use duration::{EstimatedDuration, SETUP_BUFFER_MINUTES, format_duration, job_duration};
pub use gate::{AvailabilityKey, GateOutcome, GateRequest, LatestWins, check_booking, check_draft};
pub use job::{BookableJob, Job, JobDraft, SavedServiceLine, Team, TravelQuote, snapshot};
pub use pricing::{JobTotals, LineAmounts, ManualTotals, TotalsMode, job_totals, round_money};
pub use recompute::{LineReport, Recomputed, recompute};
pub use service::{LineStatus, ServiceLine, ServiceLineInput};
pub use types::{
    Access, CatalogItemId, Diameter, DiscountPercent, JobId, JobKind, JobStatus, SoilType,
    TeamId, ValidationError, parse_datetime,
};
