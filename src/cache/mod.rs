//! Query caching in front of the store.
//!
//! The cache is an optimization and never a correctness dependency. All reads
//! degrade to a miss when the cache fails, and all writes are best effort.
//!
//! # Architecture
//!
//! - [`Cache`] - the byte-level key/value + counter interface a cache client provides
//!   (in-process map or a remote KV store)
//! - [`InMemoryCache`] - `DashMap` implementation with per-entry TTL and a size bound
//! - [`VersionedCache`] - typed layer that builds keys from an entity type, a
//!   monotonic per-type version and a canonicalized filter set
//!
//! # Invalidation Scheme
//!
//! Filtered list queries cannot be invalidated by enumerating keys, since the set of
//! possible filter combinations is unbounded. Instead every key embeds the current
//! version of its entity type:
//!
//! ```text
//! cluster_templates:v41:block_type=FB&segment=Water
//! cluster_templates:v41:all
//! ```
//!
//! Bumping the version makes every previously issued key unaddressable in O(1).
//! Old entries are never read again and simply expire. Single-record entries
//! (`template:{id}`, `parameters:{id}`) are deleted directly instead.

mod memory;
mod versioned;

pub use memory::{CacheStats, DEFAULT_MAX_ENTRIES, InMemoryCache, MAX_TTL};
pub use versioned::{EntityType, InstanceKind, VersionedCache, VersionedKey};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`Cache`] client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Transient infrastructure failure.
    #[error("cache unavailable during {operation}: {reason}")]
    Unavailable {
        /// Cache call that failed
        operation: String,
        /// Reason reported by the client
        reason: String,
    },

    /// Stored bytes could not be encoded or decoded.
    #[error("cache entry '{key}' could not be encoded or decoded: {reason}")]
    Codec {
        /// Affected key
        key: String,
        /// Serializer message
        reason: String,
    },
}

impl CacheError {
    /// Build a [`CacheError::Unavailable`] for `operation`.
    pub fn unavailable(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for cache calls.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key/value cache with expiring entries and persistent counters.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Bytes stored under `key`, or `None` on a miss or expired entry.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store `value` under `key` for at most `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove `key` if present.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically increment counter `name` (starting from 0) and return the new value.
    async fn increment_counter(&self, name: &str) -> CacheResult<u64>;

    /// Current value of counter `name`; 0 when it was never incremented.
    async fn get_counter(&self, name: &str) -> CacheResult<u64>;
}

/// A filter value that can be turned into a canonical cache key fragment.
pub trait FilterSet {
    /// Present filters as `(key, value)` pairs. Order does not matter and absent
    /// filters must be left out.
    fn filter_pairs(&self) -> Vec<(&'static str, String)>;
}

/// Deterministic, order-independent encoding of a filter set.
///
/// Pairs are sorted by key (then value) and joined as `k1=v1&k2=v2`. Pairs with an
/// empty value are dropped, and no pairs at all encode as the literal `all`, so an
/// unfiltered query has exactly one key. `%`, `&` and `=` inside values are
/// percent-escaped so distinct filter sets never collide.
pub fn canonicalize<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut encoded: Vec<(String, String)> = pairs
        .into_iter()
        .filter(|(_, value)| !value.as_ref().is_empty())
        .map(|(key, value)| (escape(key.as_ref()), escape(value.as_ref())))
        .collect();

    if encoded.is_empty() {
        return "all".to_string();
    }

    encoded.sort();
    encoded.into_iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            other => out.push(other),
        }
    }
    out
}
