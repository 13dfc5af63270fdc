//! Version-keyed typed cache on top of a raw [`Cache`].
//!
//! Keys for filtered queries look like `{prefix}{entity}:v{version}:{canonical}`,
//! and the version lives in the counter `{prefix}{entity}:version`. Per-record
//! entries use `{prefix}{kind}:{id}` and are deleted directly.
//!
//! Every method here degrades instead of failing: a read error is a miss, a write
//! error is logged at `warn` and dropped.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Cache, CacheError, CacheResult, FilterSet, canonicalize};

/// Entity types that own a version counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Cluster templates; bumped by every template or dependency mutation.
    Template,
}

impl EntityType {
    /// Namespace used in keys and counter names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "cluster_templates",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of instance-scoped entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    /// A single template record, keyed by template id.
    Template,
    /// The parameter listing of one template, keyed by template id.
    Parameters,
}

impl InstanceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Parameters => "parameters",
        }
    }
}

/// A cache key pinned to the version observed when it was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedKey {
    entity: EntityType,
    version: u64,
    key: String,
}

impl VersionedKey {
    #[must_use]
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for VersionedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Typed cache with O(1) invalidation of every filtered query of an entity type.
#[derive(Clone)]
pub struct VersionedCache {
    cache: Arc<dyn Cache>,
    key_prefix: String,
}

impl fmt::Debug for VersionedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedCache").field("key_prefix", &self.key_prefix).finish_non_exhaustive()
    }
}

impl VersionedCache {
    /// Wrap `cache`, namespacing every key and counter with `key_prefix`.
    pub fn new(cache: Arc<dyn Cache>, key_prefix: impl Into<String>) -> Self {
        Self {
            cache,
            key_prefix: key_prefix.into(),
        }
    }

    /// The underlying byte cache.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    fn counter_name(&self, entity: EntityType) -> String {
        format!("{}{}:version", self.key_prefix, entity)
    }

    fn instance_key(&self, kind: InstanceKind, id: u64) -> String {
        format!("{}{}:{}", self.key_prefix, kind.as_str(), id)
    }

    /// Read the current version of `entity`, surfacing cache failures.
    pub async fn current_version(&self, entity: EntityType) -> CacheResult<u64> {
        self.cache.get_counter(&self.counter_name(entity)).await
    }

    /// Build the key for `filters` at the current version of `entity`.
    ///
    /// Returns `None` when the version cannot be read, in which case the caller
    /// should bypass the cache entirely.
    pub async fn versioned_key(
        &self,
        entity: EntityType,
        filters: &impl FilterSet,
    ) -> Option<VersionedKey> {
        let version = match self.current_version(entity).await {
            Ok(version) => version,
            Err(e) => {
                warn!("Cannot read {} version, bypassing cache: {}", entity, e);
                return None;
            }
        };
        let key = format!(
            "{}{}:v{}:{}",
            self.key_prefix,
            entity,
            version,
            canonicalize(filters.filter_pairs())
        );
        debug!("Computed cache key {}", key);
        Some(VersionedKey {
            entity,
            version,
            key,
        })
    }

    /// Look up a value stored under an already-built key.
    pub async fn get_at<T: DeserializeOwned>(&self, key: &VersionedKey) -> Option<T> {
        self.read(key.as_str()).await
    }

    /// Store `value` under an already-built key.
    pub async fn set_at<T: Serialize>(&self, key: &VersionedKey, value: &T, ttl: Duration) {
        self.write(key.as_str(), value, ttl).await;
    }

    /// Look up `filters` at the current version of `entity`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        entity: EntityType,
        filters: &impl FilterSet,
    ) -> Option<T> {
        let key = self.versioned_key(entity, filters).await?;
        self.get_at(&key).await
    }

    /// Store `value` for `filters` at the current version of `entity`.
    pub async fn set<T: Serialize>(
        &self,
        entity: EntityType,
        filters: &impl FilterSet,
        value: &T,
        ttl: Duration,
    ) {
        if let Some(key) = self.versioned_key(entity, filters).await {
            self.set_at(&key, value, ttl).await;
        }
    }

    /// Atomically advance the version of `entity`.
    ///
    /// Returns the new version, or `None` if the cache rejected the increment.
    /// Callers run this after their store commit, so a failure can only leave
    /// cached listings stale until their TTL runs out.
    pub async fn bump_version(&self, entity: EntityType) -> Option<u64> {
        match self.cache.increment_counter(&self.counter_name(entity)).await {
            Ok(version) => {
                debug!("Bumped {} version to {}", entity, version);
                Some(version)
            }
            Err(e) => {
                warn!("Failed to bump {} version: {}", entity, e);
                None
            }
        }
    }

    /// Look up an instance-scoped entry.
    pub async fn get_instance<T: DeserializeOwned>(&self, kind: InstanceKind, id: u64) -> Option<T> {
        self.read(&self.instance_key(kind, id)).await
    }

    /// Store an instance-scoped entry.
    pub async fn set_instance<T: Serialize>(
        &self,
        kind: InstanceKind,
        id: u64,
        value: &T,
        ttl: Duration,
    ) {
        self.write(&self.instance_key(kind, id), value, ttl).await;
    }

    /// Delete an instance-scoped entry.
    pub async fn invalidate_instance(&self, kind: InstanceKind, id: u64) {
        let key = self.instance_key(kind, id);
        match self.cache.delete(&key).await {
            Ok(()) => debug!("Invalidated {}", key),
            Err(e) => warn!("Failed to invalidate {}: {}", key, e),
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}, treating as miss: {}", key, e);
                return None;
            }
        };

        match decode(key, &bytes) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("{}, treating as miss", e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match encode(key, value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };
        if let Err(e) = self.cache.set(key, bytes, ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> CacheResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CacheError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(key: &str, value: &T) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CacheError::Codec {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
