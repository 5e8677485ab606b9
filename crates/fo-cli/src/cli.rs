//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{availability, calendar, check, estimate, import, save, travel};

/// Scheduling and estimation for drilling and foundation jobs.
///
/// Prices and times service lines against the catalog, shows team
/// availability and warns about double bookings before a job is saved.
#[derive(Debug, Parser)]
#[command(name = "fo", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load catalog items, teams and saved jobs from a JSON file.
    Import(import::ImportArgs),

    /// Recompute duration and totals of a draft without saving it.
    Estimate(estimate::EstimateArgs),

    /// Show a team's free and booked slots.
    Availability(availability::AvailabilityArgs),

    /// Check a draft's booking against the team's schedule.
    Check(check::CheckArgs),

    /// Validate a draft and save it as a job or budget.
    Save(save::SaveArgs),

    /// Show every team's bookings over a date range.
    Calendar(calendar::CalendarArgs),

    /// Ask the travel service for distance and price.
    Travel(travel::TravelArgs),

    /// Show store contents and configuration.
    Status,
}
