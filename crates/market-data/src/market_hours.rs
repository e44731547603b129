//! Exchange trading-hours check.
//!
//! Answers "is at least one relevant exchange open right now" from a UTC
//! instant. Holidays are not modelled; only weekends and the regular session.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use log::warn;

/// Regular trading session of one exchange, in exchange-local wall-clock time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeSession {
    /// Display name, used in logs
    pub name: String,
    /// IANA timezone name (e.g. "America/New_York")
    pub timezone: String,
    /// Session open, minutes after local midnight (inclusive)
    pub opens_at: u32,
    /// Session close, minutes after local midnight (exclusive)
    pub closes_at: u32,
}

impl ExchangeSession {
    pub fn new(
        name: impl Into<String>,
        timezone: impl Into<String>,
        open: (u32, u32),
        close: (u32, u32),
    ) -> Self {
        Self {
            name: name.into(),
            timezone: timezone.into(),
            opens_at: open.0 * 60 + open.1,
            closes_at: close.0 * 60 + close.1,
        }
    }

    /// NYSE / Nasdaq regular session, 09:30–16:00 New York time.
    pub fn new_york() -> Self {
        Self::new("NYSE", "America/New_York", (9, 30), (16, 0))
    }

    /// Xetra regular session, 09:00–17:30 Frankfurt time.
    pub fn xetra() -> Self {
        Self::new("XETRA", "Europe/Berlin", (9, 0), (17, 30))
    }

    /// Whether the session is open at `now`. Fails when the timezone name is unknown.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> Result<bool, String> {
        let tz: Tz = self
            .timezone
            .parse()
            .map_err(|e| format!("unknown timezone '{}': {}", self.timezone, e))?;
        let local = now.with_timezone(&tz);

        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(false);
        }

        let minute_of_day = local.hour() * 60 + local.minute();
        Ok(minute_of_day >= self.opens_at && minute_of_day < self.closes_at)
    }
}

/// Stateless oracle over a fixed set of exchange sessions.
#[derive(Clone, Debug)]
pub struct MarketHoursOracle {
    sessions: Vec<ExchangeSession>,
}

impl MarketHoursOracle {
    pub fn new(sessions: Vec<ExchangeSession>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &[ExchangeSession] {
        &self.sessions
    }

    /// True if any configured exchange is in its regular session at `now_utc`.
    ///
    /// A timezone conversion failure fails open: it is logged and the oracle
    /// answers `true`, so a misconfigured environment never disables fetching.
    pub fn any_market_open(&self, now_utc: DateTime<Utc>) -> bool {
        let mut any_open = false;
        for session in &self.sessions {
            match session.is_open_at(now_utc) {
                Ok(open) => any_open |= open,
                Err(e) => {
                    warn!(
                        "Market hours check failed for {}: {}; assuming open",
                        session.name, e
                    );
                    return true;
                }
            }
        }
        any_open
    }
}

impl Default for MarketHoursOracle {
    fn default() -> Self {
        Self::new(vec![ExchangeSession::new_york(), ExchangeSession::xetra()])
    }
}
