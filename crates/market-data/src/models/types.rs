use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Provider identifier - mostly static constants
pub type ProviderId = &'static str;

/// Normalized instrument identifier (trimmed, upper-cased).
///
/// This is the only key used for cache lookups and request de-duplication,
/// so every raw symbol goes through [`Symbol::parse`] first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Normalize a raw symbol. Returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(Arc::from(trimmed.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let symbol = Symbol::parse("  aapl ").unwrap();
        assert_eq!(symbol.as_str(), "AAPL");
        assert_eq!(symbol, Symbol::parse("AAPL").unwrap());
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(Symbol::parse("").is_none());
        assert!(Symbol::parse("   \t").is_none());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let symbol = Symbol::parse("sap").unwrap();
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"SAP\"");
    }
}
