//! Field operations CLI library.
//!
//! This crate provides the CLI interface over the scheduling core, the local
//! store and the travel-price client.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
