//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`FailureScope`]: How far a failure reaches inside one client invocation

mod scope;

pub use scope::FailureScope;

use thiserror::Error;

/// Substrings that together identify an exhausted API credit quota.
const QUOTA_MARKERS: [&str; 2] = ["API credits", "limit"];

/// Errors that can occur during market data operations.
///
/// Each variant maps to a [`FailureScope`] via [`scope`](Self::scope), which
/// tells the client whether to skip one symbol, abandon the invocation, or
/// treat the outcome as an empty result.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The HTTP exchange failed (connection, timeout, non-success status).
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },

    /// The provider reported that the API credit quota is used up.
    /// No further calls are attempted in the current invocation.
    #[error("API credit limit reached: {message}")]
    QuotaExceeded {
        /// The message returned by the provider
        message: String,
    },

    /// The provider reported any other API-level error.
    #[error("API error: {message}")]
    Api {
        /// The message returned by the provider
        message: String,
    },

    /// The payload could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The payload was well formed but carried no usable data.
    #[error("No data: {0}")]
    NoData(String),

    /// The caller abandoned the operation through a cancel token.
    #[error("Operation cancelled")]
    Cancelled,

    /// The client configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A network error occurred while communicating with the provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Build an API error from a provider message, separating quota
    /// exhaustion from every other API-level failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotewatch_market_data::errors::MarketDataError;
    ///
    /// let err = MarketDataError::api("You have run out of API credits for the current minute. Wait for the next minute or upgrade to increase the limit.");
    /// assert!(err.is_quota_exceeded());
    ///
    /// let err = MarketDataError::api("**symbol** not found: XYZ");
    /// assert!(!err.is_quota_exceeded());
    /// ```
    pub fn api(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_message(&message) {
            Self::QuotaExceeded { message }
        } else {
            Self::Api { message }
        }
    }

    /// Returns true when this error means the API quota is exhausted.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Returns the failure scope for this error.
    ///
    /// - [`FailureScope::Symbol`]: drop this symbol, keep going with the rest
    /// - [`FailureScope::Invocation`]: stop issuing calls for this invocation
    /// - [`FailureScope::Empty`]: not an error path, the result is just empty
    /// - [`FailureScope::Fatal`]: the client cannot be used as configured
    pub fn scope(&self) -> FailureScope {
        match self {
            Self::Transport { .. } | Self::Api { .. } | Self::Parse(_) | Self::Network(_) => {
                FailureScope::Symbol
            }

            Self::QuotaExceeded { .. } | Self::Cancelled => FailureScope::Invocation,

            Self::NoData(_) => FailureScope::Empty,

            Self::InvalidConfig(_) => FailureScope::Fatal,
        }
    }
}

/// Checks whether a provider message describes quota exhaustion.
pub fn is_quota_message(message: &str) -> bool {
    QUOTA_MARKERS.iter().all(|marker| message.contains(marker))
}
