//! Per-invocation diagnostics for quote fetching.

use serde::Serialize;

use super::quote::Quote;
use super::types::Symbol;

/// Record of a symbol that could not be resolved in this invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolFailure {
    pub symbol: Symbol,
    pub message: String,
}

/// Detailed result of one `get_quotes` invocation.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteBatch {
    /// Resolved quotes in normalized request order.
    pub quotes: Vec<Quote>,
    /// Symbols that failed in this invocation, with their messages.
    pub failures: Vec<SymbolFailure>,
    /// Symbols left for a later invocation (beyond the batch, or after an abort).
    pub deferred: Vec<Symbol>,
    /// The provider reported quota exhaustion during this invocation.
    pub quota_exhausted: bool,
    /// The caller's cancel token fired during this invocation.
    pub cancelled: bool,
    /// Number of transport calls actually issued.
    pub outbound_calls: usize,
}

impl QuoteBatch {
    pub fn record_failure(&mut self, symbol: Symbol, message: impl Into<String>) {
        self.failures.push(SymbolFailure {
            symbol,
            message: message.into(),
        });
    }

    /// Aggregate failure message, reported only when nothing was resolved.
    pub fn summary_error(&self) -> Option<String> {
        if !self.quotes.is_empty() || self.failures.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.symbol, f.message))
            .collect();
        Some(parts.join("; "))
    }
}
