//! Command-line arguments for the QuoteWatch CLI.
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use quotewatch_market_data::HistoryInterval;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Fetch equity quotes and price history", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest quotes for one or more symbols.
    Quote {
        /// Symbols, e.g. AAPL MSFT SAP
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Price history for one symbol, oldest bar first.
    History {
        symbol: String,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Bar size: 1day, 1week or 1month
        #[arg(long, default_value = "1day")]
        interval: HistoryInterval,
    },

    /// Whether the New York or Frankfurt regular session is open now.
    MarketStatus,
}
