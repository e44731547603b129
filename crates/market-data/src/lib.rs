//! QuoteWatch Market Data Crate
//!
//! This crate provides the data-acquisition core of QuoteWatch: latest
//! quotes and price history for equities, fetched from a rate-limited
//! quotation API.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Sliding-window rate limiting shared by every outbound call
//! - A per-symbol quote cache with a freshness window
//! - Regular-session checks for New York and Frankfurt
//! - Graceful fallbacks when no live price is available
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! | MarketDataClient |  (get_quotes / get_history)
//! +------------------+
//!     |          |
//!     v          v
//! +--------+  +----------+     +-------------------+
//! | Quote  |  | Throttle |     | MarketHoursOracle |
//! | Cache  |  +----------+     +-------------------+
//! +--------+       |                     |
//!                  v                     |
//!          +----------------+            |
//!          | QuoteTransport |  (Twelve Data, mocks)
//!          +----------------+            |
//!                  |                     |
//!                  v                     v
//!          +--------------------------------+
//!          |         ResponseParser         |  (live / stale / table / default)
//!          +--------------------------------+
//!                  |
//!                  v
//!          +------------------+
//!          |  Quote / Bars    |
//!          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataClient`] - Orchestrates cache, throttle, transport, and parser
//! - [`Quote`] - Latest price for a symbol, tagged with its [`QuoteSource`]
//! - [`HistoryPoint`] - One daily/weekly/monthly bar
//! - [`QuoteBatch`] - Detailed outcome of one quote invocation
//! - [`MarketDataConfig`] - Budget, window, TTL, and endpoint settings

pub mod cache;
pub mod cancel;
pub mod client;
pub mod config;
pub mod errors;
pub mod market_hours;
pub mod models;
pub mod parser;
pub mod provider;
pub mod throttle;

#[cfg(test)]
mod client_tests;

// Re-export all public types from models
pub use models::{
    HistoryInterval, HistoryPoint, HistoryRequest, ProviderId, Quote, QuoteBatch, QuoteSource,
    Symbol, SymbolFailure,
};

pub use cache::QuoteCache;
pub use cancel::CancelToken;
pub use client::MarketDataClient;
pub use config::MarketDataConfig;
pub use errors::{FailureScope, MarketDataError};
pub use market_hours::{ExchangeSession, MarketHoursOracle};
pub use parser::{FallbackCatalog, ResponseParser};
pub use provider::{QuoteTransport, TwelveDataTransport};
pub use throttle::Throttle;
