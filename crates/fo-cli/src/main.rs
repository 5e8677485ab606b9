use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fo_cli::commands::{availability, calendar, check, estimate, import, save, status, travel};
use fo_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(fo_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = fo_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr; stdout carries command output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Import(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let summary = import::run(&mut out, &mut db, args)?;
            tracing::debug!(?summary, "import finished");
        }
        Some(Commands::Estimate(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            estimate::run(&mut out, &db, args)?;
        }
        Some(Commands::Availability(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            availability::run(&mut out, &db, args)?;
        }
        Some(Commands::Check(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            check::run(&mut out, &db, args)?;
        }
        Some(Commands::Save(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            save::run(&mut out, &mut db, args)?;
        }
        Some(Commands::Calendar(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            calendar::run(&mut out, &db, args)?;
        }
        Some(Commands::Travel(args)) => {
            // Travel doesn't touch the store
            let config = load_config(cli.config.as_deref())?;
            travel::run(&mut out, &config, args)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut out, &db, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    out.flush()?;
    Ok(())
}
