//! Transport trait definitions.
//!
//! This module defines the `QuoteTransport` trait that the client uses for
//! every outbound call. Transports return the raw payload; interpreting it is
//! the parser's job.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{HistoryRequest, ProviderId, Symbol};

/// Trait for quotation API transports.
///
/// Implement this trait to talk to a different quotation service, or to
/// script responses in tests.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use quotewatch_market_data::provider::QuoteTransport;
///
/// struct StaticTransport;
///
/// #[async_trait]
/// impl QuoteTransport for StaticTransport {
///     fn id(&self) -> &'static str {
///         "STATIC"
///     }
///
///     async fn fetch_quote(&self, symbol: &Symbol) -> Result<String, MarketDataError> {
///         Ok(format!(r#"{{"name":"{}","close":"1","change":"0"}}"#, symbol))
///     }
///
///     // ... implement fetch_time_series
/// }
/// ```
#[async_trait]
pub trait QuoteTransport: Send + Sync {
    /// Unique identifier for this transport, used in logs.
    fn id(&self) -> ProviderId;

    /// Fetch the raw latest-quote payload for one symbol.
    ///
    /// # Errors
    ///
    /// Network and HTTP-level failures map to [`MarketDataError::Transport`]
    /// (or [`MarketDataError::QuotaExceeded`] for HTTP 429). API-level errors
    /// inside a successful response are left for the parser.
    async fn fetch_quote(&self, symbol: &Symbol) -> Result<String, MarketDataError>;

    /// Fetch the raw time series payload for one symbol and date range.
    async fn fetch_time_series(&self, request: &HistoryRequest)
        -> Result<String, MarketDataError>;
}
