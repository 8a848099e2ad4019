//! In-process LRU store with per-entry expiry.
//!
//! Cached results live in a bounded LRU. Lock markers (anything written with
//! `set_if_absent`) live in a separate unbounded map, so cache pressure can
//! never evict a marker whose holder is still running. Expiry is checked
//! lazily on access; an expired entry is removed the first time it is
//! touched.

use crate::error::Result;
use crate::store::CacheLockStore;
use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default store capacity (entries).
const DEFAULT_CAPACITY: usize = 100_000;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct Entries {
    cache: LruCache<String, StoredValue>,
    markers: HashMap<String, StoredValue>,
}

/// LRU store for cache entries and lock markers.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Entries>>,
    stats: Arc<Mutex<StoreStats>>,
}

/// Store statistics for monitoring.
#[derive(Debug, Default, Clone)]
pub struct StoreStats {
    /// Reads that found a live entry.
    pub hits: u64,
    /// Reads that found nothing (or an expired entry).
    pub misses: u64,
    /// Number of entries written.
    pub additions: u64,
    /// Entries dropped because they expired.
    pub expirations: u64,
}

impl StoreStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl MemoryStore {
    /// Create a new store with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new store with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(Entries {
                cache: LruCache::new(cap),
                markers: HashMap::new(),
            })),
            stats: Arc::new(Mutex::new(StoreStats::default())),
        }
    }

    /// Remaining lifetime of a live entry or lock marker.
    #[must_use]
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.inner.lock();
        entries
            .markers
            .get(key)
            .or_else(|| entries.cache.peek(key))
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.expires_at - now)
    }

    /// Get current store statistics.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.stats.lock().clone()
    }

    /// Get the current number of entries and lock markers, including
    /// not-yet-collected expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.inner.lock();
        entries.cache.len() + entries.markers.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries and lock markers.
    pub fn clear(&self) {
        let mut entries = self.inner.lock();
        entries.cache.clear();
        entries.markers.clear();
    }

    /// Read a live entry or marker, dropping it if it has expired.
    fn live_value(&self, entries: &mut Entries, key: &str) -> Option<String> {
        let now = Instant::now();
        if let Some(marker) = entries.markers.get(key) {
            if marker.is_live(now) {
                return Some(marker.value.clone());
            }
            entries.markers.remove(key);
            self.stats.lock().expirations += 1;
        }
        match entries.cache.get(key) {
            Some(stored) if stored.is_live(now) => Some(stored.value.clone()),
            Some(_) => {
                entries.cache.pop(key);
                self.stats.lock().expirations += 1;
                None
            }
            None => None,
        }
    }

    fn stored(value: String, ttl: Duration) -> StoredValue {
        StoredValue {
            value,
            expires_at: Instant::now() + ttl,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLockStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cache = self.inner.lock();
        let found = self.live_value(&mut cache, key);

        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }

        Ok(found)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut entries = self.inner.lock();
        entries.markers.remove(key);
        entries.cache.put(key.to_string(), Self::stored(value, ttl));
        self.stats.lock().additions += 1;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool> {
        let mut entries = self.inner.lock();
        if self.live_value(&mut entries, key).is_some() {
            return Ok(false);
        }
        // Markers of crashed holders are never read again; sweep them here.
        let now = Instant::now();
        entries.markers.retain(|_, marker| marker.is_live(now));
        entries.markers.insert(key.to_string(), Self::stored(value, ttl));
        self.stats.lock().additions += 1;
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let mut entries = self.inner.lock();
        if self.live_value(&mut entries, key).as_deref() != Some(expected) {
            return Ok(false);
        }
        if entries.markers.remove(key).is_none() {
            entries.cache.pop(key);
        }
        Ok(true)
    }
}
