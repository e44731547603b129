use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Symbol;

/// Where the price of a quote came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    /// Parsed from a live provider response.
    Live,
    /// Last cached value, served past its TTL because no live price was available.
    StaleCache,
    /// Built-in reference price for a well-known symbol.
    FallbackTable,
    /// Generic placeholder price for an unknown symbol.
    GenericDefault,
}

/// Point-in-time price record for one symbol.
///
/// Quotes are never mutated after construction. A newer quote replaces an
/// older one in the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Normalized symbol
    pub symbol: Symbol,

    /// Human readable instrument name
    pub display_name: String,

    /// Last traded / closing price
    pub price: Decimal,

    /// Absolute change versus the previous close
    pub change: Decimal,

    /// Percent change versus the previous close
    pub percent_change: Decimal,

    /// When the quote was produced
    pub observed_at: DateTime<Utc>,

    /// Origin of the price
    pub source: QuoteSource,

    /// Explains why a substitute value is shown (set on every fallback path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl Quote {
    /// Create a quote from live provider data
    pub fn live(
        symbol: Symbol,
        display_name: String,
        price: Decimal,
        change: Decimal,
        percent_change: Decimal,
    ) -> Self {
        Self {
            symbol,
            display_name,
            price,
            change,
            percent_change,
            observed_at: Utc::now(),
            source: QuoteSource::Live,
            advisory: None,
        }
    }

    /// Create a substitute quote with zero change and an advisory message
    pub fn fallback(
        symbol: Symbol,
        display_name: String,
        price: Decimal,
        source: QuoteSource,
        advisory: String,
    ) -> Self {
        Self {
            symbol,
            display_name,
            price,
            change: Decimal::ZERO,
            percent_change: Decimal::ZERO,
            observed_at: Utc::now(),
            source,
            advisory: Some(advisory),
        }
    }

    /// True when the price comes straight from the provider
    pub fn is_live(&self) -> bool {
        self.source == QuoteSource::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_live() {
        let quote = Quote::live(
            Symbol::parse("AAPL").unwrap(),
            "Apple Inc.".to_string(),
            dec!(150.25),
            dec!(1.25),
            dec!(0.84),
        );
        assert_eq!(quote.price, dec!(150.25));
        assert!(quote.is_live());
        assert!(quote.advisory.is_none());
    }

    #[test]
    fn test_quote_fallback_zeroes_change() {
        let quote = Quote::fallback(
            Symbol::parse("MSFT").unwrap(),
            "Microsoft Corporation".to_string(),
            dec!(400),
            QuoteSource::FallbackTable,
            "No live data".to_string(),
        );
        assert_eq!(quote.change, Decimal::ZERO);
        assert_eq!(quote.percent_change, Decimal::ZERO);
        assert!(!quote.is_live());
        assert_eq!(quote.advisory.as_deref(), Some("No live data"));
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let quote = Quote::live(
            Symbol::parse("SAP").unwrap(),
            "SAP SE".to_string(),
            dec!(180.5),
            dec!(0),
            dec!(0),
        );
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["displayName"], "SAP SE");
        assert_eq!(json["source"], "LIVE");
        assert!(json.get("advisory").is_none());
    }
}
