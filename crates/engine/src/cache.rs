//! Exchange rate caching with TTL support.
//!
//! Entries are keyed by `(currency, transaction_date)`: two purchases made on
//! the same day in the same currency always resolve to the same rate record,
//! so the feed is queried once per key and TTL.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::{CurrencyCode, RateRecord};

/// Default time a resolved rate stays usable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

type CacheKey = (CurrencyCode, NaiveDate);

/// Cached rate entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    rate: RateRecord,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_valid(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) <= ttl
    }
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

/// Thread-safe rate cache with TTL.
///
/// Readers share the lock; `put`, `purge`, `clear` and `set_ttl` take it
/// exclusively. Nothing outside this module runs while the lock is held.
#[derive(Debug)]
pub struct RateCache {
    inner: RwLock<Inner>,
}

impl RateCache {
    /// Create a new rate cache with the default 24h TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                ttl,
            }),
        }
    }

    /// Get a rate from cache if present and not older than the TTL.
    ///
    /// Expired entries are left in place for [`RateCache::purge`].
    pub fn get(&self, currency: &CurrencyCode, transaction_date: NaiveDate) -> Option<RateRecord> {
        let inner = self.inner.read();
        let key = (currency.clone(), transaction_date);

        match inner.entries.get(&key) {
            Some(entry) if entry.is_valid(Instant::now(), inner.ttl) => {
                debug!(%currency, %transaction_date, "cache hit");
                Some(entry.rate.clone())
            }
            Some(_) => {
                debug!(%currency, %transaction_date, "cache entry expired");
                None
            }
            None => {
                debug!(%currency, %transaction_date, "cache miss");
                None
            }
        }
    }

    /// Store a rate for the purchase date that produced it. Last write wins.
    pub fn put(&self, rate: RateRecord, transaction_date: NaiveDate) {
        let key = (rate.currency.clone(), transaction_date);
        let entry = CacheEntry {
            rate,
            inserted_at: Instant::now(),
        };
        self.inner.write().entries.insert(key, entry);
    }

    /// Remove expired entries, returning how many were evicted.
    pub fn purge(&self) -> usize {
        let mut inner = self.inner.write();
        let now = Instant::now();
        let ttl = inner.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.is_valid(now, ttl));
        before - inner.entries.len()
    }

    /// Clear all cached rates.
    pub fn clear(&self) {
        self.inner.write().entries.clear();
    }

    pub fn set_ttl(&self, ttl: Duration) {
        self.inner.write().ttl = ttl;
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.inner.read().ttl
    }

    /// Get the number of entries in cache, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read();
        let now = Instant::now();
        let total = inner.entries.len();
        let valid = inner
            .entries
            .values()
            .filter(|entry| entry.is_valid(now, inner.ttl))
            .count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::{sync::Arc, thread::sleep};

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::try_from(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        crate::window::parse_date(s).unwrap()
    }

    fn make_rate(currency: &str, rate: &str) -> RateRecord {
        RateRecord {
            currency: code(currency),
            rate_date: date("2023-04-10"),
            rate: rate.parse::<Decimal>().unwrap(),
        }
    }

    #[test]
    fn test_cache_insert_and_get() {
        let cache = RateCache::new();
        let rate = make_rate("EUR", "0.85");

        cache.put(rate.clone(), date("2023-04-15"));

        assert_eq!(cache.get(&code("EUR"), date("2023-04-15")), Some(rate));
    }

    #[test]
    fn test_cache_key_includes_transaction_date() {
        let cache = RateCache::new();
        cache.put(make_rate("EUR", "0.85"), date("2023-04-15"));

        assert!(cache.get(&code("EUR"), date("2023-04-16")).is_none());
        assert!(cache.get(&code("CAD"), date("2023-04-15")).is_none());
    }

    #[test]
    fn test_cache_overwrite_last_write_wins() {
        let cache = RateCache::new();
        cache.put(make_rate("EUR", "0.85"), date("2023-04-15"));
        cache.put(make_rate("EUR", "0.90"), date("2023-04-15"));

        let cached = cache.get(&code("EUR"), date("2023-04-15")).unwrap();
        assert_eq!(cached.rate, "0.90".parse::<Decimal>().unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_expiry_and_purge() {
        let cache = RateCache::with_ttl(Duration::from_millis(50));
        cache.put(make_rate("EUR", "0.85"), date("2023-04-15"));

        assert!(cache.get(&code("EUR"), date("2023-04-15")).is_some());

        sleep(Duration::from_millis(80));

        assert!(cache.get(&code("EUR"), date("2023-04-15")).is_none());
        assert_eq!(cache.stats().expired_entries, 1);
        assert_eq!(cache.purge(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.purge(), 0);
    }

    #[test]
    fn test_set_ttl_applies_to_existing_entries() {
        let cache = RateCache::new();
        cache.put(make_rate("EUR", "0.85"), date("2023-04-15"));
        sleep(Duration::from_millis(20));

        cache.set_ttl(Duration::from_millis(1));
        assert!(cache.get(&code("EUR"), date("2023-04-15")).is_none());

        cache.set_ttl(DEFAULT_TTL);
        assert!(cache.get(&code("EUR"), date("2023-04-15")).is_some());
    }

    #[test]
    fn test_cache_clear() {
        let cache = RateCache::new();
        cache.put(make_rate("EUR", "0.85"), date("2023-04-15"));
        cache.put(make_rate("GBP", "0.75"), date("2023-04-15"));

        assert_eq!(cache.len(), 2);

        cache.clear();

        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_concurrent_writers_never_tear_entries() {
        let cache = Arc::new(RateCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    let rate = if i % 2 == 0 { "0.85" } else { "0.90" };
                    for _ in 0..200 {
                        cache.put(make_rate("EUR", rate), date("2023-04-15"));
                        let seen = cache.get(&code("EUR"), date("2023-04-15")).unwrap();
                        assert!(seen.rate == "0.85".parse::<Decimal>().unwrap()
                            || seen.rate == "0.90".parse::<Decimal>().unwrap());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
    }
}
