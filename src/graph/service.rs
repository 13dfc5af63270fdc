//! The single writer of dependency edges.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::cycle::{AdjacencySnapshot, detect_cycle};
use crate::cache::{EntityType, VersionedCache};
use crate::config::{BumpPolicy, DeletePolicy, GraphConfig, SelfReferencePolicy};
use crate::core::{CatalogError, CatalogResult, DependencyChange, TemplateId};
use crate::store::Store;

/// Validates and commits dependency-set changes and template deletions.
///
/// Every edge mutation runs inside one global critical section covering
/// snapshot, validation and commit. Two concurrent calls that each pass
/// validation on their own can therefore never jointly introduce a cycle.
pub struct DependencyGraphService {
    store: Arc<dyn Store>,
    cache: VersionedCache,
    policy: GraphConfig,
    write_lock: Mutex<()>,
}

impl DependencyGraphService {
    pub fn new(store: Arc<dyn Store>, cache: VersionedCache, policy: GraphConfig) -> Self {
        Self {
            store,
            cache,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> GraphConfig {
        self.policy
    }

    /// Replace the dependencies of `id` with exactly `desired`.
    ///
    /// Duplicates are collapsed. A self-reference is stripped or rejected according
    /// to [`SelfReferencePolicy`]. On success the edges are committed and the
    /// template version is bumped; under [`BumpPolicy::OnChange`] an unchanged set
    /// writes and bumps nothing.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if `id` or any dependency does not exist
    /// - [`CatalogError::CycleDetected`] if the new set would close a cycle; nothing
    ///   is committed
    /// - [`CatalogError::StoreUnavailable`] if the store fails
    pub async fn set_dependencies(
        &self,
        id: TemplateId,
        desired: &[TemplateId],
    ) -> CatalogResult<DependencyChange> {
        let _guard = self.write_lock.lock().await;

        if self.store.get_template(id).await?.is_none() {
            return Err(CatalogError::template_not_found(id));
        }

        let mut dependencies: BTreeSet<TemplateId> = desired.iter().copied().collect();
        for dep in &dependencies {
            if *dep != id && self.store.get_template(*dep).await?.is_none() {
                return Err(CatalogError::template_not_found(*dep));
            }
        }

        if dependencies.contains(&id) {
            match self.policy.self_reference {
                SelfReferencePolicy::Strip => {
                    debug!("Stripping self-reference from dependencies of {}", id);
                    dependencies.remove(&id);
                }
                SelfReferencePolicy::Reject => {
                    return Err(CatalogError::CycleDetected {
                        path: vec![id, id],
                    });
                }
            }
        }

        let dependencies: Vec<TemplateId> = dependencies.into_iter().collect();
        let snapshot = self.reachable_from(&dependencies, Some(id)).await?;
        detect_cycle(&snapshot, id, &dependencies)
            .map_err(|path| CatalogError::CycleDetected { path })?;

        let current = self.store.get_outgoing_edges(id).await?;
        let changed = current != dependencies;
        if changed {
            self.store.replace_outgoing_edges(id, &dependencies).await?;
            info!("Set dependencies of template {} to {:?}", id, dependencies);
        } else {
            debug!("Dependencies of template {} unchanged", id);
        }

        if changed || self.policy.bump_policy == BumpPolicy::Always {
            self.cache.bump_version(EntityType::Template).await;
        }

        Ok(DependencyChange {
            template_id: id,
            dependencies,
            changed,
        })
    }

    /// Delete a template together with its parameters and incident edges.
    ///
    /// Returns the templates that depended on it (their edge to `id` is gone).
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if `id` does not exist
    /// - [`CatalogError::HasDependents`] under [`DeletePolicy::Reject`] when others
    ///   still depend on `id`
    /// - [`CatalogError::StoreUnavailable`] if the store fails
    pub async fn delete_template(&self, id: TemplateId) -> CatalogResult<Vec<TemplateId>> {
        let _guard = self.write_lock.lock().await;

        if self.store.get_template(id).await?.is_none() {
            return Err(CatalogError::template_not_found(id));
        }

        let dependents = self.store.get_dependents(id).await?;
        if !dependents.is_empty() && self.policy.delete_policy == DeletePolicy::Reject {
            return Err(CatalogError::HasDependents { id, dependents });
        }

        if !self.store.delete_template(id).await? {
            return Err(CatalogError::template_not_found(id));
        }
        info!("Deleted template {} ({} dependents lost an edge)", id, dependents.len());

        self.cache.bump_version(EntityType::Template).await;
        Ok(dependents)
    }

    /// Consistent snapshot of `root` and everything it transitively depends on.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if `root` does not exist.
    pub async fn snapshot_from(&self, root: TemplateId) -> CatalogResult<AdjacencySnapshot> {
        let _guard = self.write_lock.lock().await;
        if self.store.get_template(root).await?.is_none() {
            return Err(CatalogError::template_not_found(root));
        }
        self.reachable_from(&[root], None).await
    }

    /// Consistent snapshot of the whole graph, every template included.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn snapshot_all(&self) -> CatalogResult<AdjacencySnapshot> {
        let _guard = self.write_lock.lock().await;
        let templates = self.store.list_templates(&crate::query::TemplateFilter::all()).await?;
        let mut snapshot = AdjacencySnapshot::new();
        for template in templates {
            let deps = self.store.get_outgoing_edges(template.id).await?;
            snapshot.insert(template.id, deps);
        }
        Ok(snapshot)
    }

    /// Breadth-first walk over stored edges starting at `roots`.
    ///
    /// `stop_at` is recorded but not expanded: its outgoing edges are about to
    /// be replaced, so the stored ones are irrelevant. Caller holds the lock.
    async fn reachable_from(
        &self,
        roots: &[TemplateId],
        stop_at: Option<TemplateId>,
    ) -> CatalogResult<AdjacencySnapshot> {
        let mut snapshot = AdjacencySnapshot::new();
        let mut queue: VecDeque<TemplateId> = roots.iter().copied().collect();

        while let Some(node) = queue.pop_front() {
            if Some(node) == stop_at || snapshot.contains(node) {
                continue;
            }
            let deps = self.store.get_outgoing_edges(node).await?;
            queue.extend(deps.iter().copied());
            snapshot.insert(node, deps);
        }

        debug!("Snapshot covers {} templates", snapshot.len());
        Ok(snapshot)
    }
}
