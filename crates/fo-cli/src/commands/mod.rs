//! CLI subcommand implementations.

pub mod availability;
pub mod calendar;
pub mod check;
pub mod estimate;
pub mod import;
pub mod save;
pub mod status;
pub mod travel;
pub mod util;
