//! Locale-invariant field extraction from loosely typed JSON payloads.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};

use crate::errors::MarketDataError;

/// Parse a decimal written with a '.' separator, as plain or scientific notation.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Read a numeric field that may arrive either as a JSON number or as text.
pub fn decimal_field(object: &Map<String, Value>, key: &str) -> Option<Decimal> {
    match object.get(key)? {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

pub fn text_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`, keeping the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date())
        })
        .ok()
}

/// Round half away from zero to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Percent change from `previous` to `current`.
///
/// Zero when `previous` is not positive or the result does not fit a `Decimal`.
pub fn percent_change(previous: Decimal, current: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    current
        .checked_sub(previous)
        .and_then(|delta| ratio_percent(delta, previous))
        .unwrap_or_else(|| {
            warn!(
                "Percent change from {} to {} overflows, using 0",
                previous, current
            );
            Decimal::ZERO
        })
}

/// `numerator / denominator * 100` rounded to 2 places, `None` on overflow.
pub fn ratio_percent(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator
        .checked_div(denominator)?
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(round2)
}

/// Decode a payload into its top-level JSON object.
pub fn payload_object(payload: &str) -> Result<Map<String, Value>, MarketDataError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| MarketDataError::Parse(format!("invalid JSON: {}", e)))?;
    match value {
        Value::Object(object) => Ok(object),
        other => Err(MarketDataError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Fail with an API error when the payload declares `"status": "error"`.
pub fn check_api_error(object: &Map<String, Value>) -> Result<(), MarketDataError> {
    let is_error = object
        .get("status")
        .and_then(Value::as_str)
        .map(|status| status.eq_ignore_ascii_case("error"))
        .unwrap_or(false);

    if is_error {
        let message = text_field(object, "message").unwrap_or("unspecified API error");
        return Err(MarketDataError::api(message));
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
