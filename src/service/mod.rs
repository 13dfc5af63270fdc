//! Template catalog façade.
//!
//! [`TemplateService`] is the API handed to the (external) HTTP layer. It wires a
//! [`Store`] and a [`Cache`] into the query and graph services and performs
//! every cache invalidation explicitly, as the last step of each mutation:
//!
//! | Operation          | Version bump          | Instance keys deleted                 |
//! |--------------------|-----------------------|---------------------------------------|
//! | `create`           | yes                   | -                                     |
//! | `update`           | yes                   | `template:{id}`                       |
//! | `delete`           | yes (graph service)   | `template:{id}`, `parameters:{id}`    |
//! | `set_dependencies` | per bump policy       | `template:{id}`                       |
//! | parameter changes  | no                    | `template:{owner}`, `parameters:{owner}` |
//!
//! Dependency lists are never cached: [`TemplateService::get`] and
//! [`TemplateService::list_compact`] always read the live edge set.

mod parameters;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::cache::{Cache, EntityType, InMemoryCache, InstanceKind, VersionedCache};
use crate::config::{CacheConfig, CatalogConfig};
use crate::core::{
    CatalogError, CatalogResult, DependencyChange, NewTemplate, Template, TemplateDetail,
    TemplateId, TemplateSummary, TemplateUpdate,
};
use crate::graph::{DependencyDag, DependencyGraphService};
use crate::query::{QueryService, TemplateFilter};
use crate::store::{InMemoryStore, Store};

/// Entry point for every catalog operation.
pub struct TemplateService {
    store: Arc<dyn Store>,
    cache: VersionedCache,
    settings: CacheConfig,
    query: QueryService,
    graph: DependencyGraphService,
}

impl TemplateService {
    /// Wire the services over an injected store and cache.
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, config: &CatalogConfig) -> Self {
        let cache = VersionedCache::new(cache, config.cache.key_prefix.clone());
        let query = QueryService::new(store.clone(), cache.clone(), config.cache.clone());
        let graph = DependencyGraphService::new(store.clone(), cache.clone(), config.graph);
        Self {
            store,
            cache,
            settings: config.cache.clone(),
            query,
            graph,
        }
    }

    /// Service over a fresh [`InMemoryStore`] and [`InMemoryCache`].
    pub fn in_memory(config: &CatalogConfig) -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryCache::with_capacity(config.cache.max_entries)),
            config,
        )
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn query(&self) -> &QueryService {
        &self.query
    }

    pub fn graph(&self) -> &DependencyGraphService {
        &self.graph
    }

    /// Create a template.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidInput`] for a blank name
    /// - [`CatalogError::DuplicateName`] if the name is taken
    pub async fn create(&self, template: NewTemplate) -> CatalogResult<TemplateId> {
        validate_name(&template.name)?;
        let created = self.store.insert_template(template).await?;
        info!("Created template {} '{}'", created.id, created.name);

        self.cache.bump_version(EntityType::Template).await;
        Ok(created.id)
    }

    /// Apply a partial update.
    ///
    /// An empty update returns the stored record without writing anything.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if `id` does not exist
    /// - [`CatalogError::InvalidInput`] for a blank new name
    /// - [`CatalogError::DuplicateName`] if a rename collides
    pub async fn update(&self, id: TemplateId, update: TemplateUpdate) -> CatalogResult<Template> {
        let current =
            self.store.get_template(id).await?.ok_or(CatalogError::template_not_found(id))?;
        if update.is_empty() {
            return Ok(current);
        }
        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        let updated = update.apply_to(&current, Utc::now());
        if !self.store.update_template(&updated).await? {
            return Err(CatalogError::template_not_found(id));
        }
        info!("Updated template {}", id);

        self.cache.bump_version(EntityType::Template).await;
        self.cache.invalidate_instance(InstanceKind::Template, id.get()).await;
        // parameter_count is owned by the store; return what it now holds
        Ok(self.store.get_template(id).await?.unwrap_or(updated))
    }

    /// Delete a template, its parameters and every incident edge.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if `id` does not exist
    /// - [`CatalogError::HasDependents`] when the delete policy is `reject`
    pub async fn delete(&self, id: TemplateId) -> CatalogResult<()> {
        self.graph.delete_template(id).await?;
        self.cache.invalidate_instance(InstanceKind::Template, id.get()).await;
        self.cache.invalidate_instance(InstanceKind::Parameters, id.get()).await;
        Ok(())
    }

    /// Replace the dependency set of `id`.
    ///
    /// # Errors
    ///
    /// Propagates [`DependencyGraphService::set_dependencies`] errors unchanged,
    /// including [`CatalogError::CycleDetected`] with its path.
    pub async fn set_dependencies(
        &self,
        id: TemplateId,
        dependencies: &[TemplateId],
    ) -> CatalogResult<DependencyChange> {
        let change = self.graph.set_dependencies(id, dependencies).await?;
        self.cache.invalidate_instance(InstanceKind::Template, id.get()).await;
        Ok(change)
    }

    /// Ids matching `filter`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn list(&self, filter: &TemplateFilter) -> CatalogResult<Vec<TemplateId>> {
        self.query.list(filter).await
    }

    /// Full records matching `filter`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn list_templates(&self, filter: &TemplateFilter) -> CatalogResult<Vec<Template>> {
        self.query.list_templates(filter).await
    }

    /// Compact rows with live dependency lists.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn list_compact(&self, filter: &TemplateFilter) -> CatalogResult<Vec<TemplateSummary>> {
        let templates = self.query.list_templates(filter).await?;
        let mut rows = Vec::with_capacity(templates.len());
        for template in templates {
            let dependencies = self.store.get_outgoing_edges(template.id).await?;
            rows.push(TemplateSummary {
                id: template.id,
                name: template.name,
                block_type: template.block_type,
                control_library: template.control_library,
                dependencies,
            });
        }
        Ok(rows)
    }

    /// A template with its live dependency list.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if `id` does not exist.
    pub async fn get(&self, id: TemplateId) -> CatalogResult<TemplateDetail> {
        let template = self.query.get(id).await?.ok_or(CatalogError::template_not_found(id))?;
        let dependencies = self.store.get_outgoing_edges(id).await?;
        Ok(TemplateDetail {
            template,
            dependencies,
        })
    }

    /// Look a template up by its unique name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NameNotFound`] if no template has that name.
    pub async fn get_by_name(&self, name: &str) -> CatalogResult<TemplateDetail> {
        match self.store.get_template_by_name(name).await? {
            Some(template) => self.get(template.id).await,
            None => Err(CatalogError::NameNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Current version of the template listing namespace.
    ///
    /// Unlike the read path this does not degrade: it reports what the cache
    /// itself holds.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CacheUnavailable`] when the counter cannot be read.
    pub async fn cache_version(&self) -> CatalogResult<u64> {
        Ok(self.cache.current_version(EntityType::Template).await?)
    }

    /// Template count per segment, largest first, ties by segment name.
    ///
    /// # Errors
    ///
    /// Returns an error when the store fails.
    pub async fn segment_counts(&self) -> CatalogResult<Vec<(String, usize)>> {
        let templates = self.store.list_templates(&TemplateFilter::all()).await?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for template in templates {
            *counts.entry(template.segment).or_default() += 1;
        }
        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }

    /// `id` and everything it depends on, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if `id` does not exist.
    pub async fn dependency_order(&self, id: TemplateId) -> CatalogResult<Vec<TemplateId>> {
        let snapshot = self.graph.snapshot_from(id).await?;
        DependencyDag::from_snapshot(&snapshot).dependency_order(id)
    }

    /// Printable dependency tree rooted at `id`, labelled with template names.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if `id` does not exist.
    pub async fn dependency_tree(&self, id: TemplateId) -> CatalogResult<String> {
        let snapshot = self.graph.snapshot_from(id).await?;
        let mut dag = DependencyDag::from_snapshot(&snapshot);
        let nodes: Vec<TemplateId> = snapshot.nodes().collect();
        for template in self.query.resolve(&nodes).await? {
            dag.set_label(template.id, template.name);
        }
        Ok(dag.to_tree_string(id))
    }

    /// Topological order of the whole catalog, verifying it is acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CycleDetected`] if the stored graph has a cycle.
    pub async fn topological_order(&self) -> CatalogResult<Vec<TemplateId>> {
        let snapshot = self.graph.snapshot_all().await?;
        DependencyDag::from_snapshot(&snapshot).topological_order()
    }
}

fn validate_name(name: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidInput {
            reason: "template name must not be empty".to_string(),
        });
    }
    Ok(())
}
