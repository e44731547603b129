//! TTL-bounded quote cache.
//!
//! Entries are replaced on every successful fetch and never deleted. An entry
//! older than the TTL is reported as a miss by [`QuoteCache::try_get`] but
//! stays readable through [`QuoteCache::try_get_stale`] for fallback use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::models::{Quote, Symbol};

/// Default freshness window for cached quotes.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: Quote,
    fetched_at: Instant,
}

/// Symbol → quote store shared by every caller of one client.
pub struct QuoteCache {
    entries: Mutex<HashMap<Symbol, CacheEntry>>,
    ttl: Duration,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Lock the entry map, recovering from poison if necessary.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<Symbol, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Quote cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Fresh quote for `symbol`, or `None` when absent or older than the TTL.
    pub fn try_get(&self, symbol: &Symbol) -> Option<Quote> {
        let entries = self.lock_entries();
        let entry = entries.get(symbol)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.quote.clone())
        } else {
            debug!("Cache entry for {} is stale", symbol);
            None
        }
    }

    /// Last stored quote for `symbol` regardless of age.
    pub fn try_get_stale(&self, symbol: &Symbol) -> Option<Quote> {
        self.lock_entries()
            .get(symbol)
            .map(|entry| entry.quote.clone())
    }

    /// Store `quote`, superseding any previous entry for `symbol`.
    pub fn put(&self, symbol: Symbol, quote: Quote) {
        let entry = CacheEntry {
            quote,
            fetched_at: Instant::now(),
        };
        self.lock_entries().insert(symbol, entry);
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
