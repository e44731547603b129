//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Normalized symbol key and provider id alias
//! - `quote` - Quote record and its price source
//! - `history` - Historical bars, intervals, and request parameters
//! - `batch` - Per-invocation fetch diagnostics

mod batch;
mod history;
mod quote;
mod types;

pub use batch::{QuoteBatch, SymbolFailure};
pub use history::{HistoryInterval, HistoryPoint, HistoryRequest};
pub use quote::{Quote, QuoteSource};
pub use types::{ProviderId, Symbol};
