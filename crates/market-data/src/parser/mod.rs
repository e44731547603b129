//! Provider payload parsing.
//!
//! Turns raw quote and time series payloads into [`Quote`] and
//! [`HistoryPoint`] values. Parsing is defensive: missing numbers default to
//! zero, malformed history rows are skipped, and an unusable price goes
//! through the fallback chain instead of failing:
//!
//! 1. last cached quote for the symbol, regardless of age
//! 2. reference price from the [`FallbackCatalog`]
//! 3. the catalog's generic default price

mod fallback;
pub(crate) mod fields;

pub use fallback::{FallbackCatalog, GENERIC_DEFAULT_PRICE};

use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::errors::MarketDataError;
use crate::models::{HistoryPoint, Quote, QuoteSource, Symbol};

use fields::{
    check_api_error, decimal_field, parse_date, payload_object, percent_change, ratio_percent,
    text_field,
};

/// Stateless payload parser holding the fallback catalog.
#[derive(Clone, Debug, Default)]
pub struct ResponseParser {
    catalog: FallbackCatalog,
}

impl ResponseParser {
    pub fn new(catalog: FallbackCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FallbackCatalog {
        &self.catalog
    }

    /// Parse a quote payload for `symbol`.
    ///
    /// `market_open` only changes the advisory wording of a stale-cache
    /// fallback. `last_known` is the newest cached quote for the symbol,
    /// whatever its age.
    ///
    /// # Errors
    ///
    /// - [`MarketDataError::QuotaExceeded`] / [`MarketDataError::Api`] when the payload has an error status
    /// - [`MarketDataError::Parse`] when the payload is not a JSON object
    pub fn parse_quote(
        &self,
        payload: &str,
        symbol: &Symbol,
        market_open: bool,
        last_known: Option<&Quote>,
    ) -> Result<Quote, MarketDataError> {
        let object = payload_object(payload)?;
        check_api_error(&object)?;

        let display_name = self.display_name(&object, symbol);
        let close = required_number(&object, "close", symbol);
        let change = required_number(&object, "change", symbol);
        let percent = decimal_field(&object, "percent_change")
            .unwrap_or_else(|| derive_percent_change(close, change));

        if close <= Decimal::ZERO {
            return Ok(self.fallback_quote(symbol, display_name, market_open, last_known));
        }

        Ok(Quote::live(symbol.clone(), display_name, close, change, percent))
    }

    /// Parse a time series payload into bars ascending by date.
    ///
    /// Malformed rows are skipped. Percent changes are computed after sorting,
    /// so the result does not depend on the provider's delivery order.
    ///
    /// # Errors
    ///
    /// - [`MarketDataError::QuotaExceeded`] / [`MarketDataError::Api`] on an error status
    /// - [`MarketDataError::Parse`] when the payload is not a JSON object
    /// - [`MarketDataError::NoData`] when no usable rows are present
    pub fn parse_history(
        &self,
        payload: &str,
        symbol: &Symbol,
    ) -> Result<Vec<HistoryPoint>, MarketDataError> {
        let object = payload_object(payload)?;
        check_api_error(&object)?;

        if let Some(meta_symbol) = object
            .get("meta")
            .and_then(Value::as_object)
            .and_then(|meta| text_field(meta, "symbol"))
        {
            if !meta_symbol.eq_ignore_ascii_case(symbol.as_str()) {
                debug!(
                    "Time series meta symbol {} differs from requested {}",
                    meta_symbol, symbol
                );
            }
        }

        let rows = match object.get("values").and_then(Value::as_array) {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                return Err(MarketDataError::NoData(format!(
                    "no time series values for {}",
                    symbol
                )))
            }
        };

        let mut points: Vec<HistoryPoint> = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let point = row.as_object().and_then(|row| history_row(row, symbol));
                if point.is_none() {
                    warn!("Skipping malformed time series row {} for {}", index, symbol);
                }
                point
            })
            .collect();

        if points.is_empty() {
            return Err(MarketDataError::NoData(format!(
                "no usable time series values for {}",
                symbol
            )));
        }

        points.sort_by(|a, b| a.date.cmp(&b.date));

        let mut previous_close: Option<Decimal> = None;
        for point in points.iter_mut() {
            point.percent_change_from_prior = previous_close
                .map(|previous| percent_change(previous, point.close))
                .unwrap_or(Decimal::ZERO);
            previous_close = Some(point.close);
        }

        debug!("Parsed {} history points for {}", points.len(), symbol);
        Ok(points)
    }

    /// Provider name, unless it is missing or just echoes the symbol.
    fn display_name(&self, object: &Map<String, Value>, symbol: &Symbol) -> String {
        match text_field(object, "name") {
            Some(name) if !name.eq_ignore_ascii_case(symbol.as_str()) => name.to_string(),
            _ => self
                .catalog
                .name_for(symbol)
                .map(str::to_string)
                .unwrap_or_else(|| symbol.to_string()),
        }
    }

    fn fallback_quote(
        &self,
        symbol: &Symbol,
        display_name: String,
        market_open: bool,
        last_known: Option<&Quote>,
    ) -> Quote {
        if let Some(previous) = last_known {
            let advisory = if market_open {
                format!(
                    "No current data for {}; showing last known price",
                    symbol
                )
            } else {
                format!(
                    "Market closed; showing last known price for {}",
                    symbol
                )
            };
            warn!("{}", advisory);
            return Quote::fallback(
                symbol.clone(),
                previous.display_name.clone(),
                previous.price,
                QuoteSource::StaleCache,
                advisory,
            );
        }

        if let Some(price) = self.catalog.price_for(symbol) {
            let advisory = format!("No live price for {}; showing reference price", symbol);
            warn!("{}", advisory);
            return Quote::fallback(
                symbol.clone(),
                display_name,
                price,
                QuoteSource::FallbackTable,
                advisory,
            );
        }

        let advisory = format!(
            "No live price for {}; showing placeholder price",
            symbol
        );
        warn!("{}", advisory);
        Quote::fallback(
            symbol.clone(),
            display_name,
            self.catalog.default_price(),
            QuoteSource::GenericDefault,
            advisory,
        )
    }
}

/// Numeric quote field that defaults to zero when missing or unparseable.
fn required_number(object: &Map<String, Value>, key: &str, symbol: &Symbol) -> Decimal {
    decimal_field(object, key).unwrap_or_else(|| {
        warn!("Quote for {} has no usable '{}' field, using 0", symbol, key);
        Decimal::ZERO
    })
}

/// `change / (close - change) * 100`, rounded to 2 places.
///
/// Zero without a positive base or when the arithmetic overflows.
fn derive_percent_change(close: Decimal, change: Decimal) -> Decimal {
    match close.checked_sub(change) {
        Some(previous_close) if previous_close > Decimal::ZERO => {
            ratio_percent(change, previous_close).unwrap_or_else(|| {
                warn!(
                    "Percent change for close {} and change {} overflows, using 0",
                    close, change
                );
                Decimal::ZERO
            })
        }
        Some(_) => Decimal::ZERO,
        None => {
            warn!(
                "Previous close for close {} and change {} overflows, using 0",
                close, change
            );
            Decimal::ZERO
        }
    }
}

fn history_row(row: &Map<String, Value>, symbol: &Symbol) -> Option<HistoryPoint> {
    let date = text_field(row, "datetime").and_then(parse_date)?;
    Some(HistoryPoint {
        symbol: symbol.clone(),
        date,
        open: decimal_field(row, "open")?,
        high: decimal_field(row, "high")?,
        low: decimal_field(row, "low")?,
        close: decimal_field(row, "close")?,
        volume: decimal_field(row, "volume"),
        percent_change_from_prior: Decimal::ZERO,
    })
}
