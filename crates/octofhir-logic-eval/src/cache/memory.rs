//! Bounded in-memory cache backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use octofhir_logic_diagnostics::LogicResult;
use octofhir_logic_types::ResultMap;
use parking_lot::RwLock;

use super::{CacheKey, LogicCache};

/// Entries kept by [`MemoryCache::new`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// One stored batch with its expiry instant. `None` never expires.
#[derive(Debug, Clone)]
struct CacheEntry {
    results: ResultMap,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Counter snapshot for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Thread-safe map of cached batches with insertion-order eviction.
///
/// The map is bounded: storing into a full cache evicts the oldest entries
/// first. Refreshing an existing key moves it to the back of the eviction
/// order.
pub struct MemoryCache {
    entries: RwLock<IndexMap<CacheKey, CacheEntry>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Cache bounded at [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Cache bounded at `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Stored entry count, expired entries included until cleaned.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Hit, miss and eviction counters since construction.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drops everything, counters included.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> LogicResult<Option<ResultMap>> {
        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired_at(Instant::now()) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.results.clone()));
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries.write().shift_remove(key);
        }
        self.record_miss();
        Ok(None)
    }

    fn put(&self, key: CacheKey, results: ResultMap, ttl_seconds: u64) -> LogicResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        let expires_at = Instant::now().checked_add(Duration::from_secs(ttl_seconds));
        let mut entries = self.entries.write();
        // Re-inserting moves the key to the back of the eviction order.
        entries.shift_remove(&key);
        entries.insert(key, CacheEntry { results, expires_at });
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> LogicResult<()> {
        self.entries.write().shift_remove(key);
        Ok(())
    }

    fn clean(&self) -> LogicResult<()> {
        let now = Instant::now();
        self.entries
            .write()
            .retain(|_, entry| !entry.is_expired_at(now));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use octofhir_logic_ast::Criteria;
    use octofhir_logic_types::{Cohort, DataValue, Fact, Facts, SubjectId};
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(token: &str) -> CacheKey {
        let cohort: Cohort = ["p1"].into_iter().collect();
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().unwrap();
        CacheKey::for_rule(&Criteria::token(token), None, date, &cohort)
    }

    fn batch(value: i64) -> ResultMap {
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().unwrap();
        let mut map = ResultMap::new();
        map.insert(
            SubjectId::new("p1"),
            Facts::single(Fact::new(DataValue::from(value), date)),
        );
        map
    }

    #[test]
    fn test_round_trip_counts_a_hit() {
        let cache = MemoryCache::new();
        cache.put(key("CD4 COUNT"), batch(100), 60).unwrap();
        let found = cache.get(&key("CD4 COUNT")).unwrap();
        assert_eq!(found, Some(batch(100)));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_zero_ttl_stores_nothing() {
        let cache = MemoryCache::new();
        cache.put(key("CD4 COUNT"), batch(100), 0).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key("CD4 COUNT")).unwrap(), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expiry_predicate() {
        let entry = CacheEntry {
            results: batch(100),
            expires_at: Some(Instant::now()),
        };
        let now = entry.expires_at.unwrap();
        assert!(entry.is_expired_at(now));
        assert!(!CacheEntry { expires_at: None, ..entry }.is_expired_at(now));
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let cache = MemoryCache::with_capacity(2);
        cache.put(key("A"), batch(1), 60).unwrap();
        cache.put(key("B"), batch(2), 60).unwrap();
        cache.put(key("C"), batch(3), 60).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("A")).unwrap(), None);
        assert_eq!(cache.get(&key("C")).unwrap(), Some(batch(3)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_refresh_moves_key_to_back_of_eviction_order() {
        let cache = MemoryCache::with_capacity(2);
        cache.put(key("A"), batch(1), 60).unwrap();
        cache.put(key("B"), batch(2), 60).unwrap();
        cache.put(key("A"), batch(10), 60).unwrap();
        cache.put(key("C"), batch(3), 60).unwrap();

        assert_eq!(cache.get(&key("B")).unwrap(), None);
        assert_eq!(cache.get(&key("A")).unwrap(), Some(batch(10)));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MemoryCache::new();
        cache.put(key("A"), batch(1), 60).unwrap();
        cache.remove(&key("A")).unwrap();
        assert!(cache.is_empty());

        cache.put(key("B"), batch(2), 60).unwrap();
        cache.get(&key("B")).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
