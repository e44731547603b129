//! QuoteWatch CLI - prints quotes, price history, and market status as JSON.
//!
//! Configuration comes from `QW_*` environment variables (a `.env` file is
//! loaded first). Log verbosity follows `RUST_LOG`; `QW_LOG_FORMAT=json`
//! switches to structured logs on stderr.
//!
//! ```bash
//! quotewatch-cli quote AAPL MSFT
//! quotewatch-cli history SAP --from 2024-01-01 --to 2024-06-30 --interval 1week
//! quotewatch-cli market-status
//! ```
mod args;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use quotewatch_market_data::{
    CancelToken, MarketDataClient, MarketDataConfig, MarketHoursOracle,
};

use crate::args::{Args, Command};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus {
    name: String,
    timezone: String,
    open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarketStatus {
    any_market_open: bool,
    sessions: Vec<SessionStatus>,
}

fn init_tracing() {
    let log_format = std::env::var("QW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Token that fires on Ctrl-C, so a throttled wait can be abandoned.
fn ctrl_c_token() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling outstanding requests");
            trigger.cancel();
        }
    });
    cancel
}

fn market_status(oracle: &MarketHoursOracle) -> MarketStatus {
    let now = Utc::now();
    let sessions = oracle
        .sessions()
        .iter()
        .map(|session| {
            let (open, error) = match session.is_open_at(now) {
                Ok(open) => (Some(open), None),
                Err(e) => (None, Some(e)),
            };
            SessionStatus {
                name: session.name.clone(),
                timezone: session.timezone.clone(),
                open,
                error,
            }
        })
        .collect();

    MarketStatus {
        any_market_open: oracle.any_market_open(now),
        sessions,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    let config = MarketDataConfig::from_env();
    tracing::debug!("Configuration: {:?}", config);

    match args.command {
        Command::Quote { symbols } => {
            let client = MarketDataClient::new(config).context("Invalid market data configuration")?;
            let batch = client
                .get_quotes_detailed(&symbols, &ctrl_c_token())
                .await;
            print_json(&batch)?;
            if let Some(message) = client.last_error() {
                anyhow::bail!("No quotes resolved: {}", message);
            }
        }
        Command::History {
            symbol,
            from,
            to,
            interval,
        } => {
            let client = MarketDataClient::new(config).context("Invalid market data configuration")?;
            let points = client
                .get_history_cancellable(&symbol, from, to, interval, &ctrl_c_token())
                .await;
            print_json(&points)?;
            if let Some(message) = client.last_error() {
                anyhow::bail!("No history for {}: {}", symbol, message);
            }
        }
        Command::MarketStatus => {
            print_json(&market_status(&MarketHoursOracle::default()))?;
        }
    }

    Ok(())
}
