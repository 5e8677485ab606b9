//! Travel command: ask the travel-price service for a quote.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fo_core::{JobDraft, TravelQuote};
use fo_travel::Client;

use super::util::{money, read_json, write_json};
use crate::Config;

#[derive(Debug, Args)]
pub struct TravelArgs {
    /// Departure address.
    #[arg(long)]
    pub origin: String,

    /// Job site address.
    #[arg(long)]
    pub destination: String,

    /// Draft to copy the quote onto; the updated draft is printed as JSON.
    #[arg(long)]
    pub apply: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &TravelArgs) -> Result<TravelQuote> {
    let client = client(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let quote = runtime
        .block_on(client.quote(&args.origin, &args.destination))
        .context("failed to get travel quote")?;

    if let Some(path) = &args.apply {
        let mut draft: JobDraft = read_json(path)?;
        draft.apply_travel(&quote);
        write_json(writer, &draft)?;
    } else if args.json {
        write_json(writer, &quote)?;
    } else {
        write_quote(writer, &quote)?;
    }
    Ok(quote)
}

fn client(config: &Config) -> Result<Client> {
    let Some(url) = config.travel_service_url.as_deref() else {
        anyhow::bail!("Travel service URL not configured. Set FO_TRAVEL_SERVICE_URL or travel_service_url in config.toml");
    };
    Client::new(url, config.travel_api_key.clone()).context("failed to create travel client")
}

pub fn write_quote<W: Write>(writer: &mut W, quote: &TravelQuote) -> std::io::Result<()> {
    writeln!(writer, "Distance: {} km", quote.distance_km.normalize())?;
    writeln!(writer, "Travel price: {}", money(quote.travel_price))?;
    if let Some(description) = &quote.travel_description {
        writeln!(writer, "Description: {description}")?;
    }
    Ok(())
}
