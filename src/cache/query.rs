//! TTL-bound LRU cache for per-(model, query) results.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(cap) => cap,
    None => unreachable!(),
};

/// A cached model answer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached content.
    pub value: String,

    /// Moment the entry was stored.
    pub inserted_at: Instant,
}

impl CacheEntry {
    /// Creates a new entry stamped with the current time.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            inserted_at: Instant::now(),
        }
    }

    /// Checks whether the entry has outlived `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Current number of entries, expired ones included until swept.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Number of cache hits.
    pub hits: u64,

    /// Number of cache misses.
    pub misses: u64,
}

impl CacheStats {
    /// Calculates the hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache of model answers keyed by a hash of (model, query).
///
/// Shared between concurrent queries; every mutation happens under one lock.
pub struct QueryCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Creates a new cache.
    ///
    /// # Arguments
    /// - `capacity`: Maximum number of entries
    /// - `ttl`: Time to live of each entry, measured from insertion
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a cache with the default configuration.
    pub fn default_config() -> Self {
        Self::new(DEFAULT_CAPACITY.get(), Duration::from_secs(3600)) // 1 hour TTL
    }

    /// Configured time to live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Deterministic key for a (model, query) pair.
    ///
    /// The first 32 hex characters of SHA-256 over `"{model}:{query}"`.
    pub fn cache_key(model: &str, query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update(b":");
        hasher.update(query.as_bytes());

        let mut key = hex::encode(hasher.finalize());
        key.truncate(32);
        key
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a cached answer.
    ///
    /// Returns `None` if absent or expired; expired entries are dropped on read.
    pub fn get(&self, model: &str, query: &str) -> Option<String> {
        let key = Self::cache_key(model, query);
        let mut entries = self.lock();

        // peek first so an expired entry does not get promoted
        let is_expired = entries.peek(&key).map(|e| e.is_expired(self.ttl));

        match is_expired {
            Some(true) => {
                entries.pop(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(false) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(model, "Cache hit");
                entries.get(&key).map(|e| e.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores an answer, replacing any previous one for the same pair.
    pub fn set(&self, model: &str, query: &str, value: impl Into<String>) {
        let key = Self::cache_key(model, query);
        self.lock().put(key, CacheEntry::new(value));
    }

    /// Invalidates a specific entry.
    pub fn invalidate(&self, model: &str, query: &str) {
        let key = Self::cache_key(model, query);
        self.lock().pop(&key);
    }

    /// Clears the whole cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            size: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn clear_expired(&self) -> usize {
        let mut entries = self.lock();

        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|(_, v)| v.is_expired(self.ttl))
            .map(|(k, _)| k.clone())
            .collect();

        for key in &expired_keys {
            entries.pop(key);
        }

        expired_keys.len()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_generation() {
        let key1 = QueryCache::cache_key("gpt-4o", "What is 2+2?");
        let key2 = QueryCache::cache_key("gpt-4o", "What is 2+2?");
        let key3 = QueryCache::cache_key("claude", "What is 2+2?");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_eq!(key1.len(), 32);
        assert!(key1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_hit() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        cache.set("gpt-4o", "q", "four");

        assert_eq!(cache.get("gpt-4o", "q").as_deref(), Some("four"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_cache_miss() {
        let cache = QueryCache::new(10, Duration::from_secs(60));

        assert!(cache.get("gpt-4o", "never set").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_cache_expiration_without_sweep() {
        // a TTL of 0 means every entry is already expired
        let cache = QueryCache::new(10, Duration::from_secs(0));
        cache.set("gpt-4o", "q", "four");

        assert!(cache.get("gpt-4o", "q").is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_cache_lru_eviction() {
        let cache = QueryCache::new(2, Duration::from_secs(60));

        cache.set("m", "q1", "1");
        cache.set("m", "q2", "2");
        cache.set("m", "q3", "3"); // evicts q1

        assert!(cache.get("m", "q1").is_none());
        assert!(cache.get("m", "q2").is_some());
        assert!(cache.get("m", "q3").is_some());
    }

    #[test]
    fn test_cache_invalidate_and_clear() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        cache.set("m", "q1", "1");
        cache.set("m", "q2", "2");

        cache.invalidate("m", "q1");
        assert!(cache.get("m", "q1").is_none());
        assert!(cache.get("m", "q2").is_some());

        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_clear_expired_sweeps_everything_stale() {
        let cache = QueryCache::new(10, Duration::from_secs(0));
        cache.set("m", "q1", "1");
        cache.set("m", "q2", "2");

        assert_eq!(cache.stats().size, 2);
        assert_eq!(cache.clear_expired(), 2);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        cache.set("m", "q1", "1");

        cache.get("m", "q1"); // hit
        cache.get("m", "q2"); // miss
        cache.get("m", "q1"); // hit

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 10);
        assert!((stats.hit_rate() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_cache_entry_is_expired() {
        let entry = CacheEntry::new("value");

        assert!(!entry.is_expired(Duration::from_secs(3600)));
        assert!(entry.is_expired(Duration::from_secs(0)));
    }
}
