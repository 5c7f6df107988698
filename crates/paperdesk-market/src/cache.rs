//! TTL quote cache.
//!
//! Read-heavy map keyed by `(symbol, market)`. Expiry is lazy on read;
//! there is no eviction thread since the key space is bounded by the
//! distinct symbol count. Writes carrying a timestamp at or before the
//! stored entry's are discarded, so a late or duplicated quote can
//! never roll the cache backwards.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use paperdesk_core::{Market, Quote};
use paperdesk_telemetry::Metrics;
use tracing::debug;

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

struct CachedQuote {
    quote: Quote,
    stored_at: Instant,
}

/// Concurrent quote cache with a fixed TTL.
pub struct QuoteCache {
    entries: DashMap<(String, Market), CachedQuote>,
    ttl: Duration,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh quote for the key, if stored within the TTL window.
    pub fn get(&self, symbol: &str, market: Market) -> Option<Quote> {
        let key = (symbol.to_string(), market);
        let fresh = match self.entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.quote.clone()),
            Some(_) => None,
            None => {
                Metrics::cache_miss();
                return None;
            }
        };
        match fresh {
            Some(quote) => {
                Metrics::cache_hit();
                Some(quote)
            }
            None => {
                // Expired: drop the entry now rather than waiting for a write
                self.entries
                    .remove_if(&key, |_, e| e.stored_at.elapsed() >= self.ttl);
                Metrics::cache_miss();
                None
            }
        }
    }

    /// Store a quote. Returns false when the write is discarded because
    /// its timestamp does not advance past the stored entry's.
    pub fn put(&self, quote: Quote) -> bool {
        use dashmap::mapref::entry::Entry;

        let key = (quote.symbol.clone(), quote.market);
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if quote.timestamp_ms <= occupied.get().quote.timestamp_ms {
                    debug!(
                        symbol = %quote.symbol,
                        incoming = quote.timestamp_ms,
                        stored = occupied.get().quote.timestamp_ms,
                        "Discarding cache write with non-increasing timestamp"
                    );
                    Metrics::cache_stale_write();
                    return false;
                }
                occupied.insert(CachedQuote {
                    quote,
                    stored_at: Instant::now(),
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CachedQuote {
                    quote,
                    stored_at: Instant::now(),
                });
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
