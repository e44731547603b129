//! Substitute names and prices used when a provider gives no usable data.
//!
//! The catalog is data only. The order in which it is consulted (stale cache,
//! then table, then generic default) lives in the parser.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::Symbol;

/// Generic placeholder price for symbols the catalog does not know.
pub const GENERIC_DEFAULT_PRICE: Decimal = dec!(100.00);

/// Built-in display names (symbol, name).
const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("GOOGL", "Alphabet Inc."),
    ("AMZN", "Amazon.com Inc."),
    ("META", "Meta Platforms Inc."),
    ("NVDA", "NVIDIA Corporation"),
    ("TSLA", "Tesla Inc."),
    ("NFLX", "Netflix Inc."),
    ("JPM", "JPMorgan Chase & Co."),
    ("V", "Visa Inc."),
    ("SAP", "SAP SE"),
    ("SIE", "Siemens AG"),
    ("ALV", "Allianz SE"),
    ("DTE", "Deutsche Telekom AG"),
    ("BMW", "Bayerische Motoren Werke AG"),
];

/// Conservative reference prices (symbol, price).
const BUILTIN_PRICES: &[(&str, Decimal)] = &[
    ("AAPL", dec!(180.00)),
    ("MSFT", dec!(400.00)),
    ("GOOGL", dec!(140.00)),
    ("AMZN", dec!(150.00)),
    ("META", dec!(450.00)),
    ("NVDA", dec!(120.00)),
    ("TSLA", dec!(200.00)),
    ("NFLX", dec!(600.00)),
    ("JPM", dec!(190.00)),
    ("V", dec!(270.00)),
    ("SAP", dec!(180.00)),
    ("SIE", dec!(170.00)),
    ("ALV", dec!(250.00)),
    ("DTE", dec!(22.00)),
    ("BMW", dec!(95.00)),
];

/// Injectable lookup of fallback names and prices.
#[derive(Clone, Debug)]
pub struct FallbackCatalog {
    names: HashMap<String, String>,
    prices: HashMap<String, Decimal>,
    default_price: Decimal,
}

impl FallbackCatalog {
    /// Empty catalog: every symbol falls through to `default_price`.
    pub fn new(default_price: Decimal) -> Self {
        Self {
            names: HashMap::new(),
            prices: HashMap::new(),
            default_price,
        }
    }

    /// Catalog preloaded with well-known US and German large caps.
    pub fn builtin() -> Self {
        let mut catalog = Self::new(GENERIC_DEFAULT_PRICE);
        for (symbol, name) in BUILTIN_NAMES {
            catalog.names.insert((*symbol).to_string(), (*name).to_string());
        }
        for (symbol, price) in BUILTIN_PRICES {
            catalog.prices.insert((*symbol).to_string(), *price);
        }
        catalog
    }

    pub fn with_name(mut self, symbol: &str, name: impl Into<String>) -> Self {
        if let Some(symbol) = Symbol::parse(symbol) {
            self.names.insert(symbol.to_string(), name.into());
        }
        self
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        if let Some(symbol) = Symbol::parse(symbol) {
            self.prices.insert(symbol.to_string(), price);
        }
        self
    }

    pub fn name_for(&self, symbol: &Symbol) -> Option<&str> {
        self.names.get(symbol.as_str()).map(String::as_str)
    }

    pub fn price_for(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.get(symbol.as_str()).copied()
    }

    pub fn default_price(&self) -> Decimal {
        self.default_price
    }
}

impl Default for FallbackCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
