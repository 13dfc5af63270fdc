//! In-process [`Cache`] with per-entry expiry and a size bound.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{Cache, CacheResult};

/// Default bound on the number of live entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Longest TTL an entry is kept for; longer requests are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheSlot {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheSlot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Hit/miss counters and size of an [`InMemoryCache`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage; 0 when nothing was looked up yet.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Concurrent in-memory cache.
///
/// Entries expire after their TTL; expired entries are dropped lazily on read and
/// eagerly when the size bound is hit. Counters live in a separate map and never
/// expire or get evicted, since losing one would let an old version become
/// addressable again.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheSlot>,
    counters: DashMap<String, u64>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCache {
    /// Create a cache bounded to [`DEFAULT_MAX_ENTRIES`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache holding at most `max_entries` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            counters: DashMap::new(),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Whether a live (unexpired) entry exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|slot| !slot.is_expired(Instant::now()))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Make room for one more entry.
    fn enforce_capacity(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        let purged = self.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }

        while self.entries.len() >= self.max_entries {
            // Evict whatever would expire soonest
            let victim = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            match victim {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        // The read guard must be gone before `remove_if` locks the same shard
        let lookup = self
            .entries
            .get(key)
            .map(|slot| (!slot.is_expired(now)).then(|| slot.value.clone()));
        let value = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, slot| slot.is_expired(now));
                None
            }
            None => None,
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        if !self.entries.contains_key(key) {
            self.enforce_capacity();
        }
        let now = Instant::now();
        let slot = CacheSlot {
            value,
            expires_at: now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now),
        };
        self.entries.insert(key.to_string(), slot);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn increment_counter(&self, name: &str) -> CacheResult<u64> {
        let mut counter = self.counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn get_counter(&self, name: &str) -> CacheResult<u64> {
        Ok(self.counters.get(name).map_or(0, |value| *value))
    }
}
