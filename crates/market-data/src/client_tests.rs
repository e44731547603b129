//! Tests for MarketDataClient orchestration.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::cancel::CancelToken;
use crate::client::MarketDataClient;
use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::market_hours::MarketHoursOracle;
use crate::models::{HistoryInterval, HistoryRequest, ProviderId, QuoteSource, Symbol};
use crate::parser::FallbackCatalog;
use crate::provider::QuoteTransport;

// =============================================================================
// Mock transport
// =============================================================================

#[derive(Clone)]
enum Reply {
    Payload(String),
    TransportError(String),
}

#[derive(Clone, Default)]
struct MockTransport {
    quotes: Arc<Mutex<HashMap<String, Reply>>>,
    history: Arc<Mutex<Option<Reply>>>,
    calls: Arc<Mutex<Vec<String>>>,
    call_times: Arc<Mutex<Vec<Instant>>>,
    latency: Duration,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn set_quote(&self, symbol: &str, close: &str, change: &str) {
        let payload = json!({
            "symbol": symbol,
            "name": format!("{} Inc", symbol),
            "close": close,
            "change": change,
        });
        self.set_reply(symbol, Reply::Payload(payload.to_string()));
    }

    fn set_quota_exhausted(&self, symbol: &str) {
        let payload = json!({
            "code": 429,
            "status": "error",
            "message": "You have run out of API credits for the current minute. 13 API credits were used, with the current limit being 12.",
        });
        self.set_reply(symbol, Reply::Payload(payload.to_string()));
    }

    fn set_failure(&self, symbol: &str, message: &str) {
        self.set_reply(symbol, Reply::TransportError(message.to_string()));
    }

    fn set_reply(&self, symbol: &str, reply: Reply) {
        self.quotes
            .lock()
            .unwrap()
            .insert(symbol.to_string(), reply);
    }

    fn set_history(&self, payload: serde_json::Value) {
        *self.history.lock().unwrap() = Some(Reply::Payload(payload.to_string()));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn into_result(reply: Option<Reply>, what: &str) -> Result<String, MarketDataError> {
        match reply {
            Some(Reply::Payload(payload)) => Ok(payload),
            Some(Reply::TransportError(message)) => Err(MarketDataError::Transport { message }),
            None => Err(MarketDataError::Transport {
                message: format!("no scripted reply for {}", what),
            }),
        }
    }
}

#[async_trait]
impl QuoteTransport for MockTransport {
    fn id(&self) -> ProviderId {
        "MOCK"
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<String, MarketDataError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.call_times.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let reply = self.quotes.lock().unwrap().get(symbol.as_str()).cloned();
        Self::into_result(reply, symbol.as_str())
    }

    async fn fetch_time_series(
        &self,
        request: &HistoryRequest,
    ) -> Result<String, MarketDataError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("history:{}", request.symbol));
        let reply = self.history.lock().unwrap().clone();
        Self::into_result(reply, "history")
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> MarketDataConfig {
    MarketDataConfig {
        rate_budget: 100,
        call_delay: Duration::ZERO,
        ..MarketDataConfig::new("test-key")
    }
}

fn client_with(config: MarketDataConfig, transport: &MockTransport) -> MarketDataClient {
    MarketDataClient::with_transport(&config, Arc::new(transport.clone()))
        .unwrap()
        // No sessions: the market always reads as closed
        .with_market_hours(MarketHoursOracle::new(vec![]))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn symbols_of(quotes: &[crate::models::Quote]) -> Vec<&str> {
    quotes.iter().map(|q| q.symbol.as_str()).collect()
}

// =============================================================================
// Quotes
// =============================================================================

#[tokio::test]
async fn test_fresh_cache_hit_skips_transport() {
    let transport = MockTransport::new();
    transport.set_quote("AAPL", "190.50", "1.50");
    let client = client_with(test_config(), &transport);

    let first = client.get_quotes(&["AAPL"]).await;
    let second = client.get_quotes(&["aapl"]).await;

    assert_eq!(transport.call_count(), 1);
    assert_eq!(first, second);
    assert_eq!(second[0].price, dec!(190.50));
    assert_eq!(second[0].source, QuoteSource::Live);
}

#[tokio::test]
async fn test_symbols_are_normalized_and_deduplicated() {
    let transport = MockTransport::new();
    transport.set_quote("AAPL", "190", "0");
    transport.set_quote("MSFT", "410", "0");
    let client = client_with(test_config(), &transport);

    let quotes = client.get_quotes(&[" aapl", "MSFT", "AAPL ", ""]).await;

    assert_eq!(symbols_of(&quotes), vec!["AAPL", "MSFT"]);
    assert_eq!(transport.calls(), vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn test_percent_change_is_derived_when_missing() {
    let transport = MockTransport::new();
    transport.set_quote("SAP", "98.8", "-1.2");
    let client = client_with(test_config(), &transport);

    let quotes = client.get_quotes(&["SAP"]).await;

    assert_eq!(quotes[0].percent_change, dec!(-1.20));
    assert_eq!(quotes[0].display_name, "SAP Inc");
}

#[tokio::test]
async fn test_batch_size_spreads_symbols_over_invocations() {
    let transport = MockTransport::new();
    for symbol in ["A", "B", "C", "D", "E"] {
        transport.set_quote(symbol, "10", "0");
    }
    let client = client_with(test_config(), &transport);
    let symbols = ["A", "B", "C", "D", "E"];
    let cancel = CancelToken::new();

    let first = client.get_quotes_detailed(&symbols, &cancel).await;
    assert_eq!(symbols_of(&first.quotes), vec!["A", "B"]);
    assert_eq!(first.outbound_calls, 2);
    let deferred: Vec<&str> = first.deferred.iter().map(Symbol::as_str).collect();
    assert_eq!(deferred, vec!["C", "D", "E"]);

    let second = client.get_quotes_detailed(&symbols, &cancel).await;
    assert_eq!(symbols_of(&second.quotes), vec!["A", "B", "C", "D"]);
    assert_eq!(second.outbound_calls, 2);

    let third = client.get_quotes_detailed(&symbols, &cancel).await;
    assert_eq!(symbols_of(&third.quotes), vec!["A", "B", "C", "D", "E"]);
    assert_eq!(third.outbound_calls, 1);
    assert!(third.deferred.is_empty());

    assert_eq!(transport.calls(), vec!["A", "B", "C", "D", "E"]);
}

#[tokio::test]
async fn test_quota_exhaustion_stops_the_invocation() {
    let transport = MockTransport::new();
    transport.set_quote("A", "10", "0");
    transport.set_quota_exhausted("B");
    transport.set_quote("C", "30", "0");
    let config = MarketDataConfig {
        batch_size: 3,
        ..test_config()
    };
    let client = client_with(config, &transport);

    let batch = client
        .get_quotes_detailed(&["A", "B", "C"], &CancelToken::new())
        .await;

    assert_eq!(transport.calls(), vec!["A", "B"]);
    assert_eq!(symbols_of(&batch.quotes), vec!["A"]);
    assert!(batch.quota_exhausted);
    assert!(!batch.cancelled);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].symbol.as_str(), "B");
    assert_eq!(batch.deferred.len(), 1);
    assert_eq!(batch.deferred[0].as_str(), "C");
    // Partial result is not an error
    assert!(client.last_error().is_none());
}

#[tokio::test]
async fn test_single_symbol_failure_keeps_the_rest() {
    let transport = MockTransport::new();
    transport.set_failure("A", "connection reset");
    transport.set_quote("B", "20", "0.5");
    let client = client_with(test_config(), &transport);

    let batch = client
        .get_quotes_detailed(&["A", "B"], &CancelToken::new())
        .await;

    assert_eq!(transport.calls(), vec!["A", "B"]);
    assert_eq!(symbols_of(&batch.quotes), vec!["B"]);
    assert_eq!(batch.failures.len(), 1);
    assert!(batch.failures[0].message.contains("connection reset"));
    assert!(client.last_error().is_none());
}

#[tokio::test]
async fn test_all_failures_set_last_error_until_next_success() {
    let transport = MockTransport::new();
    transport.set_failure("A", "timeout");
    transport.set_failure("B", "HTTP 503");
    let client = client_with(test_config(), &transport);

    let quotes = client.get_quotes(&["A", "B"]).await;
    assert!(quotes.is_empty());
    let message = client.last_error().unwrap();
    assert!(message.contains("A: "));
    assert!(message.contains("HTTP 503"));

    transport.set_quote("A", "11", "0");
    let quotes = client.get_quotes(&["A"]).await;
    assert_eq!(quotes.len(), 1);
    assert!(client.last_error().is_none());
}

#[tokio::test]
async fn test_api_error_payload_is_a_symbol_failure() {
    let transport = MockTransport::new();
    transport.set_reply(
        "XYZ",
        Reply::Payload(
            json!({"code": 404, "status": "error", "message": "**symbol** not found: XYZ"})
                .to_string(),
        ),
    );
    transport.set_quote("MSFT", "400", "0");
    let client = client_with(test_config(), &transport);

    let batch = client
        .get_quotes_detailed(&["XYZ", "MSFT"], &CancelToken::new())
        .await;

    assert!(!batch.quota_exhausted);
    assert_eq!(symbols_of(&batch.quotes), vec!["MSFT"]);
    assert!(batch.failures[0].message.contains("not found"));
}

// =============================================================================
// Fallbacks
// =============================================================================

#[tokio::test]
async fn test_stale_cache_fallback_is_not_cached() {
    let transport = MockTransport::new();
    transport.set_quote("AAPL", "150", "2");
    let config = MarketDataConfig {
        cache_ttl: Duration::from_millis(50),
        ..test_config()
    };
    let client = client_with(config, &transport);

    let live = client.get_quotes(&["AAPL"]).await;
    assert_eq!(live[0].source, QuoteSource::Live);

    tokio::time::sleep(Duration::from_millis(80)).await;
    transport.set_quote("AAPL", "0", "0");

    let stale = client.get_quotes(&["AAPL"]).await;
    assert_eq!(stale[0].source, QuoteSource::StaleCache);
    assert_eq!(stale[0].price, dec!(150));
    assert_eq!(stale[0].display_name, "AAPL Inc");
    assert_eq!(
        stale[0].advisory.as_deref(),
        Some("Market closed; showing last known price for AAPL")
    );
    assert!(client.cache().try_get(&Symbol::parse("AAPL").unwrap()).is_none());

    client.get_quotes(&["AAPL"]).await;
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_reference_and_generic_fallbacks() {
    let transport = MockTransport::new();
    transport.set_quote("XYZ", "0", "0");
    transport.set_quote("QQQQ", "0", "0");
    let client = client_with(test_config(), &transport).with_catalog(
        FallbackCatalog::new(dec!(1.00))
            .with_name("XYZ", "Xyz Holdings")
            .with_price("XYZ", dec!(42)),
    );

    let quotes = client.get_quotes(&["XYZ", "QQQQ"]).await;

    assert_eq!(quotes[0].source, QuoteSource::FallbackTable);
    assert_eq!(quotes[0].price, dec!(42));
    assert!(quotes[0].advisory.is_some());
    assert_eq!(quotes[1].source, QuoteSource::GenericDefault);
    assert_eq!(quotes[1].price, dec!(1.00));
    assert_eq!(quotes[1].change, dec!(0));
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_builtin_table_price_for_well_known_symbol() {
    let transport = MockTransport::new();
    transport.set_quote("MSFT", "0", "0");
    let client = client_with(test_config(), &transport);

    let quotes = client.get_quotes(&["MSFT"]).await;

    assert_eq!(quotes[0].source, QuoteSource::FallbackTable);
    assert_eq!(quotes[0].price, dec!(400));
}

// =============================================================================
// Concurrency and cancellation
// =============================================================================

#[tokio::test]
async fn test_concurrent_callers_share_one_fetch() {
    let transport = MockTransport::with_latency(Duration::from_millis(100));
    transport.set_quote("AAPL", "190", "0");
    let client = Arc::new(client_with(test_config(), &transport));

    let a = {
        let client = client.clone();
        tokio::spawn(async move { client.get_quotes(&["AAPL"]).await })
    };
    let b = {
        let client = client.clone();
        tokio::spawn(async move { client.get_quotes(&["AAPL"]).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_issues_no_calls() {
    let transport = MockTransport::new();
    transport.set_quote("AAPL", "190", "0");
    let client = client_with(test_config(), &transport);
    let cancel = CancelToken::new();
    cancel.cancel();

    let batch = client.get_quotes_detailed(&["AAPL"], &cancel).await;

    assert!(batch.cancelled);
    assert!(batch.quotes.is_empty());
    assert_eq!(batch.outbound_calls, 0);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_releases_a_throttled_wait() {
    let transport = MockTransport::new();
    transport.set_quote("A", "1", "0");
    transport.set_quote("B", "2", "0");
    let config = MarketDataConfig {
        rate_budget: 1,
        rate_window: Duration::from_secs(60),
        ..test_config()
    };
    let client = client_with(config, &transport);

    assert_eq!(client.get_quotes(&["A"]).await.len(), 1);

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let batch = client.get_quotes_detailed(&["B"], &cancel).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(batch.cancelled);
    assert!(batch.quotes.is_empty());
    assert_eq!(batch.outbound_calls, 0);
    assert_eq!(transport.calls(), vec!["A"]);
}

#[tokio::test]
async fn test_call_delay_spaces_calls_within_a_batch() {
    let transport = MockTransport::new();
    transport.set_quote("A", "1", "0");
    transport.set_quote("B", "2", "0");
    let call_delay = Duration::from_millis(50);
    let config = MarketDataConfig {
        batch_size: 2,
        call_delay,
        ..test_config()
    };
    let client = client_with(config, &transport);

    let started = Instant::now();
    let quotes = client.get_quotes(&["A", "B"]).await;

    assert_eq!(quotes.len(), 2);
    let times = transport.call_times();
    assert_eq!(times.len(), 2);
    assert!(times[0].duration_since(started) < call_delay);
    assert!(times[1].duration_since(times[0]) >= call_delay);
}

#[tokio::test]
async fn test_throttle_counts_every_call() {
    let transport = MockTransport::new();
    transport.set_quote("A", "1", "0");
    transport.set_quote("B", "2", "0");
    let client = client_with(test_config(), &transport);

    client.get_quotes(&["A", "B"]).await;

    assert_eq!(client.throttle().calls_in_window(), 2);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_is_sorted_with_percent_changes() {
    let transport = MockTransport::new();
    transport.set_history(json!({
        "meta": {"symbol": "AAPL", "interval": "1day"},
        "values": [
            {"datetime": "2024-01-04", "open": "101", "high": "103", "low": "98", "close": "99", "volume": "1000"},
            {"datetime": "2024-01-02", "open": "99", "high": "101", "low": "98", "close": "100", "volume": "1200"},
            {"datetime": "2024-01-03", "open": "100", "high": "103", "low": "99", "close": "102", "volume": "900"}
        ],
        "status": "ok"
    }));
    let client = client_with(test_config(), &transport);

    let points = client
        .get_history("aapl", date(2024, 1, 1), date(2024, 1, 31), HistoryInterval::OneDay)
        .await;

    let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]);
    let changes: Vec<_> = points.iter().map(|p| p.percent_change_from_prior).collect();
    assert_eq!(changes, vec![dec!(0), dec!(2.00), dec!(-2.94)]);
    assert_eq!(transport.calls(), vec!["history:AAPL"]);
    assert!(client.last_error().is_none());
}

#[tokio::test]
async fn test_history_error_payload_returns_empty() {
    let transport = MockTransport::new();
    transport.set_history(json!({
        "code": 400,
        "status": "error",
        "message": "No data is available on the specified dates."
    }));
    let client = client_with(test_config(), &transport);

    let points = client
        .get_history("AAPL", date(2024, 1, 1), date(2024, 1, 31), HistoryInterval::OneWeek)
        .await;

    assert!(points.is_empty());
    assert!(client.last_error().unwrap().contains("No data is available"));
}

#[tokio::test]
async fn test_history_without_values_is_no_data() {
    let transport = MockTransport::new();
    transport.set_history(json!({"meta": {"symbol": "AAPL"}, "values": [], "status": "ok"}));
    let client = client_with(test_config(), &transport);

    let points = client
        .get_history("AAPL", date(2024, 1, 1), date(2024, 1, 31), HistoryInterval::OneDay)
        .await;

    assert!(points.is_empty());
    assert!(client.last_error().is_some());
}

#[tokio::test]
async fn test_history_rejects_reversed_range_without_calling() {
    let transport = MockTransport::new();
    let client = client_with(test_config(), &transport);

    let points = client
        .get_history("AAPL", date(2024, 2, 1), date(2024, 1, 1), HistoryInterval::OneDay)
        .await;
    assert!(points.is_empty());
    assert!(client.last_error().unwrap().contains("Invalid history range"));

    let points = client
        .get_history("  ", date(2024, 1, 1), date(2024, 2, 1), HistoryInterval::OneDay)
        .await;
    assert!(points.is_empty());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_history_and_quotes_share_the_rate_window() {
    let transport = MockTransport::new();
    transport.set_quote("A", "1", "0");
    transport.set_history(json!({
        "values": [{"datetime": "2024-01-02", "open": "1", "high": "1", "low": "1", "close": "1"}]
    }));
    let client = client_with(test_config(), &transport);

    client.get_quotes(&["A"]).await;
    let points = client
        .get_history("A", date(2024, 1, 1), date(2024, 1, 5), HistoryInterval::OneDay)
        .await;

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].volume, None);
    assert_eq!(client.throttle().calls_in_window(), 2);
}
