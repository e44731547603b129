//! Market data client - orchestrates cache, throttle, transport, and parser.
//!
//! # Flow
//!
//! ```text
//! get_quotes(symbols)
//!   │ normalize + de-duplicate
//!   ▼
//! QuoteCache::try_get ──hit──────────────────────────────┐
//!   │ miss                                               │
//!   ▼                                                    │
//! single-flight lock → re-check cache                    │
//!   │                                                    │
//!   ▼  (first `batch_size` symbols, rest deferred)       │
//! Throttle::acquire → QuoteTransport → ResponseParser    │
//!   │                                                    │
//!   ▼                                                    ▼
//! QuoteCache::put (live quotes only) ──────────────► result
//! ```
//!
//! No fetch entry point returns an error. Failures are logged, recorded per
//! symbol, and surfaced through [`MarketDataClient::last_error`] or the
//! detailed [`QuoteBatch`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use tokio::sync::MutexGuard as AsyncMutexGuard;

use crate::cache::QuoteCache;
use crate::cancel::CancelToken;
use crate::config::MarketDataConfig;
use crate::errors::{FailureScope, MarketDataError};
use crate::market_hours::MarketHoursOracle;
use crate::models::{HistoryInterval, HistoryPoint, HistoryRequest, Quote, QuoteBatch, Symbol};
use crate::parser::{FallbackCatalog, ResponseParser};
use crate::provider::{QuoteTransport, TwelveDataTransport};
use crate::throttle::Throttle;

/// Market data client.
///
/// One instance owns its cache and rate window; share it between callers
/// with `Arc`. All outbound calls of an instance are serialized: at most one
/// call in flight, at most `rate_budget` calls per `rate_window`.
pub struct MarketDataClient {
    transport: Arc<dyn QuoteTransport>,
    parser: ResponseParser,
    cache: QuoteCache,
    throttle: Throttle,
    market_hours: MarketHoursOracle,
    batch_size: usize,
    call_delay: Duration,
    /// Single-flight guard for outbound work.
    fetch_lock: tokio::sync::Mutex<()>,
    last_error: Mutex<Option<String>>,
}

impl MarketDataClient {
    /// Create a client that talks to Twelve Data.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: MarketDataConfig) -> Result<Self, MarketDataError> {
        config.validate()?;
        let transport = Arc::new(TwelveDataTransport::new(&config));
        Self::with_transport(&config, transport)
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(
        config: &MarketDataConfig,
        transport: Arc<dyn QuoteTransport>,
    ) -> Result<Self, MarketDataError> {
        config.validate()?;

        info!(
            "Market data client using '{}' ({} calls / {:?}, batch {}, cache TTL {:?})",
            transport.id(),
            config.rate_budget,
            config.rate_window,
            config.batch_size,
            config.cache_ttl
        );

        Ok(Self {
            transport,
            parser: ResponseParser::default(),
            cache: QuoteCache::new(config.cache_ttl),
            throttle: Throttle::new(config.rate_budget, config.rate_window),
            market_hours: MarketHoursOracle::default(),
            batch_size: config.batch_size,
            call_delay: config.call_delay,
            fetch_lock: tokio::sync::Mutex::new(()),
            last_error: Mutex::new(None),
        })
    }

    /// Replace the fallback name/price catalog.
    pub fn with_catalog(mut self, catalog: FallbackCatalog) -> Self {
        self.parser = ResponseParser::new(catalog);
        self
    }

    /// Replace the exchange sessions used for the market-open check.
    pub fn with_market_hours(mut self, market_hours: MarketHoursOracle) -> Self {
        self.market_hours = market_hours;
        self
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Whether any configured exchange is currently in session.
    pub fn is_market_open(&self) -> bool {
        self.market_hours.any_market_open(Utc::now())
    }

    /// Diagnostic message of the most recent invocation that produced nothing.
    pub fn last_error(&self) -> Option<String> {
        self.lock_last_error().clone()
    }

    fn lock_last_error(&self) -> MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(|poisoned| {
            warn!("Last error mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn set_last_error(&self, message: Option<String>) {
        *self.lock_last_error() = message;
    }

    /// Quotes for `symbols`, from cache where fresh and from the provider otherwise.
    ///
    /// The result follows the normalized request order and may be partial:
    /// failed symbols are omitted, and only the first `batch_size` uncached
    /// symbols are fetched per invocation.
    pub async fn get_quotes<S: AsRef<str>>(&self, symbols: &[S]) -> Vec<Quote> {
        self.get_quotes_detailed(symbols, &CancelToken::new())
            .await
            .quotes
    }

    /// Same as [`get_quotes`](Self::get_quotes), with cancellation and full diagnostics.
    pub async fn get_quotes_detailed<S: AsRef<str>>(
        &self,
        symbols: &[S],
        cancel: &CancelToken,
    ) -> QuoteBatch {
        let requested = normalize_symbols(symbols);
        let mut resolved: HashMap<Symbol, Quote> = HashMap::new();
        let mut to_fetch: Vec<Symbol> = Vec::new();

        for symbol in &requested {
            match self.cache.try_get(symbol) {
                Some(quote) => {
                    resolved.insert(symbol.clone(), quote);
                }
                None => to_fetch.push(symbol.clone()),
            }
        }

        let mut batch = QuoteBatch::default();

        if to_fetch.is_empty() {
            debug!("All {} symbols served from cache", requested.len());
        } else if let Some(_guard) = self.lock_fetch(cancel).await {
            // Another caller may have fetched some of these while we waited
            to_fetch.retain(|symbol| match self.cache.try_get(symbol) {
                Some(quote) => {
                    resolved.insert(symbol.clone(), quote);
                    false
                }
                None => true,
            });

            self.fetch_batch(to_fetch, &mut resolved, &mut batch, cancel)
                .await;
        } else {
            batch.cancelled = true;
            for symbol in to_fetch {
                batch.record_failure(symbol, MarketDataError::Cancelled.to_string());
            }
        }

        batch.quotes = requested
            .iter()
            .filter_map(|symbol| resolved.remove(symbol))
            .collect();

        self.set_last_error(batch.summary_error());
        batch
    }

    /// Fetch the first `batch_size` symbols of `to_fetch`; defer the rest.
    async fn fetch_batch(
        &self,
        mut to_fetch: Vec<Symbol>,
        resolved: &mut HashMap<Symbol, Quote>,
        batch: &mut QuoteBatch,
        cancel: &CancelToken,
    ) {
        if to_fetch.is_empty() {
            return;
        }

        let deferred = to_fetch.split_off(self.batch_size.min(to_fetch.len()));
        if !deferred.is_empty() {
            debug!(
                "Fetching {} symbols now, deferring {} to a later call",
                to_fetch.len(),
                deferred.len()
            );
        }

        let market_open = self.market_hours.any_market_open(Utc::now());
        let mut pending = to_fetch.into_iter();
        let mut first = true;

        while let Some(symbol) = pending.next() {
            if !first && !self.call_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.call_delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            first = false;

            match self.fetch_quote(&symbol, market_open, cancel, batch).await {
                Ok(quote) => {
                    if quote.is_live() {
                        self.cache.put(symbol.clone(), quote.clone());
                    }
                    resolved.insert(symbol, quote);
                }
                Err(e) => match e.scope() {
                    FailureScope::Invocation => {
                        warn!("Stopping quote fetch at {}: {}", symbol, e);
                        if e.is_quota_exceeded() {
                            batch.quota_exhausted = true;
                        } else {
                            batch.cancelled = true;
                        }
                        batch.record_failure(symbol, e.to_string());
                        batch.deferred.extend(pending.by_ref());
                        break;
                    }
                    FailureScope::Symbol | FailureScope::Empty | FailureScope::Fatal => {
                        warn!("Failed to fetch quote for {}: {}", symbol, e);
                        batch.record_failure(symbol, e.to_string());
                    }
                },
            }
        }

        batch.deferred.extend(deferred);

        info!(
            "Quote fetch finished: {} resolved, {} failed, {} deferred, {} calls",
            resolved.len(),
            batch.failures.len(),
            batch.deferred.len(),
            batch.outbound_calls
        );
    }

    /// One throttled transport call plus parsing.
    async fn fetch_quote(
        &self,
        symbol: &Symbol,
        market_open: bool,
        cancel: &CancelToken,
        batch: &mut QuoteBatch,
    ) -> Result<Quote, MarketDataError> {
        self.throttle.acquire_cancellable(cancel).await?;
        batch.outbound_calls += 1;

        let payload = tokio::select! {
            result = self.transport.fetch_quote(symbol) => result?,
            _ = cancel.cancelled() => return Err(MarketDataError::Cancelled),
        };

        let last_known = self.cache.try_get_stale(symbol);
        self.parser
            .parse_quote(&payload, symbol, market_open, last_known.as_ref())
    }

    /// Acquire the single-flight lock unless `cancel` fires first.
    async fn lock_fetch(&self, cancel: &CancelToken) -> Option<AsyncMutexGuard<'_, ()>> {
        if cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            guard = self.fetch_lock.lock() => Some(guard),
            _ = cancel.cancelled() => None,
        }
    }

    /// Daily/weekly/monthly bars for `symbol` between `from` and `to`, ascending.
    ///
    /// Returns an empty vector when the provider has no data or the call
    /// fails; the reason is available from [`last_error`](Self::last_error).
    pub async fn get_history(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        interval: HistoryInterval,
    ) -> Vec<HistoryPoint> {
        self.get_history_cancellable(symbol, from, to, interval, &CancelToken::new())
            .await
    }

    /// Same as [`get_history`](Self::get_history), abandoning the throttled
    /// wait or the call when `cancel` fires.
    pub async fn get_history_cancellable(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        interval: HistoryInterval,
        cancel: &CancelToken,
    ) -> Vec<HistoryPoint> {
        let Some(symbol) = Symbol::parse(symbol) else {
            self.set_last_error(Some("History requested for an empty symbol".to_string()));
            return Vec::new();
        };

        if from > to {
            self.set_last_error(Some(format!(
                "Invalid history range for {}: {} is after {}",
                symbol, from, to
            )));
            return Vec::new();
        }

        let request = HistoryRequest {
            symbol,
            from,
            to,
            interval,
        };

        match self.fetch_history(&request, cancel).await {
            Ok(points) => {
                self.set_last_error(None);
                points
            }
            Err(e) => {
                match e.scope() {
                    FailureScope::Empty => info!("No history for {}: {}", request.symbol, e),
                    _ => warn!("Failed to fetch history for {}: {}", request.symbol, e),
                }
                self.set_last_error(Some(e.to_string()));
                Vec::new()
            }
        }
    }

    async fn fetch_history(
        &self,
        request: &HistoryRequest,
        cancel: &CancelToken,
    ) -> Result<Vec<HistoryPoint>, MarketDataError> {
        let _guard = self
            .lock_fetch(cancel)
            .await
            .ok_or(MarketDataError::Cancelled)?;

        self.throttle.acquire_cancellable(cancel).await?;

        let payload = tokio::select! {
            result = self.transport.fetch_time_series(request) => result?,
            _ = cancel.cancelled() => return Err(MarketDataError::Cancelled),
        };

        self.parser.parse_history(&payload, &request.symbol)
    }
}

/// Trim, upper-case, drop blanks, and collapse duplicates (first occurrence wins).
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .filter_map(|raw| Symbol::parse(raw.as_ref()))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbols() {
        let symbols = normalize_symbols(&[" aapl", "AAPL ", "", "msft", "Aapl", "  "]);
        let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = MarketDataConfig {
            batch_size: 0,
            ..MarketDataConfig::new("key")
        };
        assert!(matches!(
            MarketDataClient::new(config),
            Err(MarketDataError::InvalidConfig(_))
        ));
    }
}
