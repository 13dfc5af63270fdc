//! Configuration for the cluster catalog
//!
//! Settings live in a single TOML file. Every field has a default, so a missing
//! file or a missing section simply yields the defaults below.
//!
//! # Location
//!
//! 1. `--config PATH` on the command line
//! 2. `CCAT_CONFIG_PATH` environment variable
//! 3. `~/.ccat/config.toml`
//!
//! # Format
//!
//! ```toml
//! [cache]
//! key_prefix = ""
//! list_ttl_secs = 300
//! instance_ttl_secs = 300
//! parameters_ttl_secs = 900
//! max_entries = 10000
//!
//! [graph]
//! self_reference = "strip"   # or "reject"
//! delete_policy = "cascade"  # or "reject"
//! bump_policy = "on-change"  # or "always"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::cache::MAX_TTL;
use crate::core::CatalogError;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "CCAT_CONFIG_PATH";

const fn default_list_ttl_secs() -> u64 {
    300
}

const fn default_instance_ttl_secs() -> u64 {
    300
}

const fn default_parameters_ttl_secs() -> u64 {
    900
}

const fn default_max_entries() -> usize {
    crate::cache::DEFAULT_MAX_ENTRIES
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Cache key namespace, TTLs and in-memory bound.
    pub cache: CacheConfig,
    /// Dependency graph policies.
    pub graph: GraphConfig,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Prepended to every key and counter, for caches shared between deployments.
    pub key_prefix: String,
    /// TTL of filtered list entries.
    #[serde(default = "default_list_ttl_secs")]
    pub list_ttl_secs: u64,
    /// TTL of single-template entries.
    #[serde(default = "default_instance_ttl_secs")]
    pub instance_ttl_secs: u64,
    /// TTL of per-template parameter listings.
    #[serde(default = "default_parameters_ttl_secs")]
    pub parameters_ttl_secs: u64,
    /// Size bound of the in-process cache.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            list_ttl_secs: default_list_ttl_secs(),
            instance_ttl_secs: default_instance_ttl_secs(),
            parameters_ttl_secs: default_parameters_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }

    #[must_use]
    pub const fn instance_ttl(&self) -> Duration {
        Duration::from_secs(self.instance_ttl_secs)
    }

    #[must_use]
    pub const fn parameters_ttl(&self) -> Duration {
        Duration::from_secs(self.parameters_ttl_secs)
    }
}

/// What `set_dependencies` does when a template lists itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelfReferencePolicy {
    /// Drop the self id and continue.
    #[default]
    Strip,
    /// Fail with a one-element cycle.
    Reject,
}

/// What deleting a template that others depend on does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Delete anyway; inbound edges are dropped with the template.
    #[default]
    Cascade,
    /// Refuse with `HasDependents`.
    Reject,
}

/// When a dependency-set call bumps the template version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BumpPolicy {
    /// Only when the stored set actually changes.
    #[default]
    OnChange,
    /// On every successful call.
    Always,
}

/// `[graph]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    pub self_reference: SelfReferencePolicy,
    pub delete_policy: DeletePolicy,
    pub bump_policy: BumpPolicy,
}

impl CatalogConfig {
    /// Load from `CCAT_CONFIG_PATH` or `~/.ccat/config.toml`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, contains
    /// unknown keys, or fails [`CatalogConfig::validate`].
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate().with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Default config location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".ccat").join("config.toml"))
    }

    /// Reject values that would make the cache unusable.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let zero = [
            ("cache.list_ttl_secs", self.cache.list_ttl_secs == 0),
            ("cache.instance_ttl_secs", self.cache.instance_ttl_secs == 0),
            ("cache.parameters_ttl_secs", self.cache.parameters_ttl_secs == 0),
            ("cache.max_entries", self.cache.max_entries == 0),
        ];
        if let Some((key, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(CatalogError::Config {
                message: format!("{key} must be greater than zero"),
            });
        }

        let max = MAX_TTL.as_secs();
        let ttls = [
            ("cache.list_ttl_secs", self.cache.list_ttl_secs),
            ("cache.instance_ttl_secs", self.cache.instance_ttl_secs),
            ("cache.parameters_ttl_secs", self.cache.parameters_ttl_secs),
        ];
        match ttls.iter().find(|(_, secs)| *secs > max) {
            Some((key, _)) => Err(CatalogError::Config {
                message: format!("{key} must be at most {max} seconds"),
            }),
            None => Ok(()),
        }
    }
}
