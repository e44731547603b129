//! Twelve Data HTTP transport.
//!
//! This module talks to the Twelve Data REST API:
//! - Latest quotes via the /quote endpoint
//! - Daily, weekly, and monthly bars via the /time_series endpoint
//!
//! Twelve Data answers most API-level errors with HTTP 200 and a
//! `{"status":"error"}` body, so those are returned as payloads and classified
//! by the parser. The free tier allows 8–12 credits per minute.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{HistoryRequest, ProviderId, Symbol};
use crate::provider::QuoteTransport;

const PROVIDER_ID: &str = "TWELVE_DATA";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Twelve Data transport.
pub struct TwelveDataTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TwelveDataTransport {
    /// Create a transport from the client configuration.
    pub fn new(config: &MarketDataConfig) -> Self {
        Self::with_timeout(
            config.base_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )
    }

    pub fn with_timeout(base_url: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to build HTTP client with a {:?} timeout, using defaults: {}",
                    timeout, e
                );
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build the full request URL, API key included.
    fn endpoint_url(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Url, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let base = format!("{}/{}", self.base_url, endpoint);
        reqwest::Url::parse_with_params(&base, &all_params).map_err(|e| {
            MarketDataError::Transport {
                message: format!("Failed to build URL: {}", e),
            }
        })
    }

    /// URL as safe to log: the `apikey` query value is masked.
    fn redacted(url: &reqwest::Url) -> String {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| {
                let value = if key == "apikey" {
                    "***".to_string()
                } else {
                    value.into_owned()
                };
                (key.into_owned(), value)
            })
            .collect();

        let mut redacted = url.clone();
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
        redacted.to_string()
    }

    /// Make a GET request and return the body text.
    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let url = self.endpoint_url(endpoint, params)?;
        debug!("{} request: {}", PROVIDER_ID, Self::redacted(&url));

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Transport {
                    message: format!("{} request timed out", PROVIDER_ID),
                }
            } else {
                // The URL carries the API key
                MarketDataError::Network(e.without_url())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::QuotaExceeded {
                message: format!("{} returned HTTP 429 (API credits limit)", PROVIDER_ID),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::Transport {
                message: format!("HTTP {}", status),
            });
        }

        Ok(response.text().await.map_err(reqwest::Error::without_url)?)
    }
}

#[async_trait]
impl QuoteTransport for TwelveDataTransport {
    fn id(&self) -> ProviderId {
        PROVIDER_ID
    }

    async fn fetch_quote(&self, symbol: &Symbol) -> Result<String, MarketDataError> {
        self.fetch("quote", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_time_series(
        &self,
        request: &HistoryRequest,
    ) -> Result<String, MarketDataError> {
        let start = request.from.format(DATE_FORMAT).to_string();
        let end = request.to.format(DATE_FORMAT).to_string();
        let params = [
            ("symbol", request.symbol.as_str()),
            ("interval", request.interval.as_str()),
            ("start_date", start.as_str()),
            ("end_date", end.as_str()),
        ];
        self.fetch("time_series", &params).await
    }
}
