use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::Symbol;

/// Bar size for historical requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryInterval {
    #[default]
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "1month")]
    OneMonth,
}

impl HistoryInterval {
    /// Interval string as understood by the time series endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1day",
            Self::OneWeek => "1week",
            Self::OneMonth => "1month",
        }
    }
}

impl fmt::Display for HistoryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1day" | "day" | "daily" => Ok(Self::OneDay),
            "1week" | "week" | "weekly" => Ok(Self::OneWeek),
            "1month" | "month" | "monthly" => Ok(Self::OneMonth),
            other => Err(format!("unsupported interval: {}", other)),
        }
    }
}

/// Parameters of one time series request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub interval: HistoryInterval,
}

/// One OHLCV bar of a symbol's price history.
///
/// Sequences returned by the parser are ascending by `date`, and
/// `percent_change_from_prior` is derived from the previous bar's close
/// (zero for the first bar).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub symbol: Symbol,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    pub percent_change_from_prior: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_round_trips_api_strings() {
        assert_eq!("1day".parse::<HistoryInterval>().unwrap(), HistoryInterval::OneDay);
        assert_eq!("Weekly".parse::<HistoryInterval>().unwrap(), HistoryInterval::OneWeek);
        assert_eq!(HistoryInterval::OneMonth.as_str(), "1month");
        assert!("5min".parse::<HistoryInterval>().is_err());
    }

    #[test]
    fn test_interval_default_is_daily() {
        assert_eq!(HistoryInterval::default(), HistoryInterval::OneDay);
    }
}
