//! Read path: cached template listings and lookups.
//!
//! List queries cache only the sorted id list under a versioned key; full records
//! are resolved from the store (or the instance cache) when the caller needs them.
//! Single-template lookups go through the instance cache keyed by id.

mod filters;

pub use filters::{FilterKey, TemplateFilter};

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{EntityType, InstanceKind, VersionedCache};
use crate::config::CacheConfig;
use crate::core::{CatalogResult, Template, TemplateId};
use crate::store::Store;

/// Cached read access to templates.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn Store>,
    cache: VersionedCache,
    settings: CacheConfig,
}

impl QueryService {
    pub fn new(store: Arc<dyn Store>, cache: VersionedCache, settings: CacheConfig) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// Ids of templates matching `filter`, ordered by name.
    ///
    /// On a miss the result is written back under the version observed before the
    /// store was read, so a concurrent mutation can only make this entry
    /// unreachable, never serve it under the post-mutation version.
    ///
    /// # Errors
    ///
    /// Returns [`crate::core::CatalogError::StoreUnavailable`] when the store fails.
    /// Cache failures only cost a store round trip.
    pub async fn list(&self, filter: &TemplateFilter) -> CatalogResult<Vec<TemplateId>> {
        let key = self.cache.versioned_key(EntityType::Template, filter).await;
        if let Some(key) = &key {
            if let Some(ids) = self.cache.get_at::<Vec<TemplateId>>(key).await {
                return Ok(ids);
            }
        }

        let mut templates = self.store.list_templates(filter).await?;
        templates.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let ids: Vec<TemplateId> = templates.into_iter().map(|t| t.id).collect();
        debug!("Listed {} templates from store", ids.len());

        if let Some(key) = &key {
            self.cache.set_at(key, &ids, self.settings.list_ttl()).await;
        }
        Ok(ids)
    }

    /// Fetch one template, populating the instance cache on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store fails.
    pub async fn get(&self, id: TemplateId) -> CatalogResult<Option<Template>> {
        if let Some(template) =
            self.cache.get_instance::<Template>(InstanceKind::Template, id.get()).await
        {
            return Ok(Some(template));
        }

        let template = self.store.get_template(id).await?;
        if let Some(template) = &template {
            self.cache
                .set_instance(InstanceKind::Template, id.get(), template, self.settings.instance_ttl())
                .await;
        }
        Ok(template)
    }

    /// Resolve ids to records, keeping the input order.
    ///
    /// Ids that no longer exist are skipped: a cached listing may name a template
    /// deleted since, until the version bump of that delete is observed.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn resolve(&self, ids: &[TemplateId]) -> CatalogResult<Vec<Template>> {
        let found = try_join_all(ids.iter().map(|id| self.get(*id))).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// Filter and resolve in one call.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn list_templates(&self, filter: &TemplateFilter) -> CatalogResult<Vec<Template>> {
        let ids = self.list(filter).await?;
        self.resolve(&ids).await
    }
}
