//! TTL caching for catalog lookups.
//!
//! Discovery shells out to the `shortcuts` binary, which is slow enough
//! to matter on every listing. The cache memoizes discovery and
//! metadata results under per-entry TTLs.
//!
//! A read that finds an entry older than its TTL behaves as a miss; the
//! stale entry is left in place and overwritten by the next `set` for
//! the same key. There is no eviction beyond that: the key space is
//! catalog-scale by construction.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cached payload with its creation time and time-to-live.
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) < self.ttl
    }
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    hits: u64,
    misses: u64,
}

/// Key-value store with per-entry expiry and hit/miss accounting.
pub struct TtlCache<T> {
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Get a fresh value for `key`, or `None` on miss.
    ///
    /// An expired entry counts as a miss and is not removed.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut state = self.state.lock().expect("cache lock poisoned");
        let now = Instant::now();
        match state.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                let value = entry.value.clone();
                state.hits += 1;
                Some(value)
            }
            _ => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key` with the given time-to-live.
    pub fn set(&self, key: &str, value: T, ttl: Duration) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Drop every entry. Counters are preserved.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock().expect("cache lock poisoned");
        state.entries.clear();
    }

    /// Get hit/miss statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock().expect("cache lock poisoned");
        CacheStats {
            hits: state.hits,
            misses: state.misses,
        }
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache hit/miss statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of reads served from cache, 0.0 when no reads happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let cache = TtlCache::new();
        cache.set("k", 42u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.get("absent"), None);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = TtlCache::new();
        cache.set("k", "v".to_string(), Duration::from_millis(30));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("k"), None);

        // A fresh set for the same key serves again
        cache.set("k", "v2".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_invalidate_all() {
        let cache = TtlCache::new();
        cache.set("a", 1, Duration::from_secs(60));
        cache.set("b", 2, Duration::from_secs(60));
        cache.invalidate_all();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_stats_accounting() {
        let cache = TtlCache::new();
        assert_eq!(cache.stats().hit_rate(), 0.0);

        cache.set("k", 1, Duration::from_secs(60));
        let _ = cache.get("k"); // hit
        let _ = cache.get("k"); // hit
        let _ = cache.get("nope"); // miss

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }
}
