//! Client configuration.
//!
//! Defaults match the free tier of the quotation API: 12 calls per minute,
//! quotes cached for 15 minutes, two symbols per fetch cycle.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::errors::MarketDataError;
use crate::throttle::{DEFAULT_RATE_BUDGET, DEFAULT_RATE_WINDOW};

pub const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
pub const DEFAULT_BATCH_SIZE: usize = 2;
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings consumed by [`MarketDataClient`](crate::MarketDataClient).
#[derive(Clone)]
pub struct MarketDataConfig {
    pub api_key: String,
    pub base_url: String,
    /// Calls allowed per `rate_window`
    pub rate_budget: usize,
    pub rate_window: Duration,
    /// Freshness window of cached quotes
    pub cache_ttl: Duration,
    /// Symbols fetched per `get_quotes` invocation
    pub batch_size: usize,
    /// Pause between consecutive calls inside one batch
    pub call_delay: Duration,
    pub request_timeout: Duration,
}

impl MarketDataConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `QW_*` environment variables.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("QW_API_KEY").unwrap_or_default(),
            base_url: std::env::var("QW_BASE_URL").unwrap_or(defaults.base_url),
            rate_budget: env_or("QW_RATE_BUDGET", defaults.rate_budget),
            rate_window: Duration::from_secs(env_or(
                "QW_RATE_WINDOW_SECS",
                defaults.rate_window.as_secs(),
            )),
            cache_ttl: Duration::from_secs(env_or(
                "QW_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            batch_size: env_or("QW_BATCH_SIZE", defaults.batch_size),
            call_delay: Duration::from_millis(env_or(
                "QW_CALL_DELAY_MS",
                defaults.call_delay.as_millis() as u64,
            )),
            request_timeout: Duration::from_secs(env_or(
                "QW_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    /// Reject settings the client cannot work with.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        if self.rate_budget == 0 {
            return Err(MarketDataError::InvalidConfig(
                "rate budget must be at least 1".to_string(),
            ));
        }
        if self.rate_window.is_zero() {
            return Err(MarketDataError::InvalidConfig(
                "rate window must be longer than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(MarketDataError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            MarketDataError::InvalidConfig(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;
        if self.api_key.trim().is_empty() {
            warn!("No API key configured; provider calls will be rejected");
        }
        Ok(())
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_budget: DEFAULT_RATE_BUDGET,
            rate_window: DEFAULT_RATE_WINDOW,
            cache_ttl: DEFAULT_CACHE_TTL,
            batch_size: DEFAULT_BATCH_SIZE,
            call_delay: DEFAULT_CALL_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for MarketDataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketDataConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("rate_budget", &self.rate_budget)
            .field("rate_window", &self.rate_window)
            .field("cache_ttl", &self.cache_ttl)
            .field("batch_size", &self.batch_size)
            .field("call_delay", &self.call_delay)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
