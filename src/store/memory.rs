//! In-process [`Store`] backed by concurrent maps.
//!
//! Uses `DashMap` for lock-free reads and per-shard write locking. Single-record
//! operations (name claims, counter adjustments, edge replacement) happen under
//! one shard guard and are therefore atomic with respect to each other.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Store, StoreError, StoreResult};
use crate::core::{NewParameter, NewTemplate, Parameter, ParameterId, Template, TemplateId};
use crate::query::TemplateFilter;

/// Concurrent in-memory catalog storage.
#[derive(Debug)]
pub struct InMemoryStore {
    templates: DashMap<TemplateId, Template>,
    /// Unique-name index. A name is claimed here before the row is written.
    names: DashMap<String, TemplateId>,
    edges: DashMap<TemplateId, BTreeSet<TemplateId>>,
    parameters: DashMap<ParameterId, Parameter>,
    next_template_id: AtomicU64,
    next_parameter_id: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
            names: DashMap::new(),
            edges: DashMap::new(),
            parameters: DashMap::new(),
            next_template_id: AtomicU64::new(1),
            next_parameter_id: AtomicU64::new(1),
        }
    }

    /// Every stored edge `(from, to)`, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<(TemplateId, TemplateId)> {
        let mut edges: Vec<_> = self
            .edges
            .iter()
            .flat_map(|entry| {
                let from = *entry.key();
                entry.value().iter().map(move |to| (from, *to)).collect::<Vec<_>>()
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Number of stored templates.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Number of stored parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_template(&self, id: TemplateId) -> StoreResult<Option<Template>> {
        Ok(self.templates.get(&id).map(|t| t.value().clone()))
    }

    async fn get_template_by_name(&self, name: &str) -> StoreResult<Option<Template>> {
        let Some(id) = self.names.get(name).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.templates.get(&id).map(|t| t.value().clone()))
    }

    async fn list_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<Template>> {
        Ok(self
            .templates
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn insert_template(&self, template: NewTemplate) -> StoreResult<Template> {
        let id = match self.names.entry(template.name.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::NameConflict {
                    name: template.name,
                });
            }
            Entry::Vacant(slot) => {
                let id = TemplateId(self.next_template_id.fetch_add(1, Ordering::SeqCst));
                slot.insert(id);
                id
            }
        };

        let now = Utc::now();
        let record = Template {
            id,
            name: template.name,
            payload: template.payload,
            segment: template.segment,
            block_type: template.block_type,
            control_library: template.control_library,
            protected: template.protected,
            parameter_count: 0,
            uploaded_by: template.actor.clone(),
            updated_by: template.actor,
            uploaded_at: now,
            updated_at: now,
        };
        self.templates.insert(id, record.clone());
        Ok(record)
    }

    async fn update_template(&self, template: &Template) -> StoreResult<bool> {
        let Some(previous_name) = self.templates.get(&template.id).map(|t| t.name.clone()) else {
            return Ok(false);
        };

        let renamed = previous_name != template.name;
        if renamed {
            match self.names.entry(template.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::NameConflict {
                        name: template.name.clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(template.id);
                }
            }
        }

        let updated = match self.templates.get_mut(&template.id) {
            Some(mut row) => {
                // Counter is owned by increment_parameter_count
                let parameter_count = row.parameter_count;
                *row = template.clone();
                row.parameter_count = parameter_count;
                true
            }
            None => false,
        };

        if renamed {
            let released = if updated { &previous_name } else { &template.name };
            self.names.remove_if(released, |_, owner| *owner == template.id);
        }
        Ok(updated)
    }

    async fn delete_template(&self, id: TemplateId) -> StoreResult<bool> {
        let Some((_, removed)) = self.templates.remove(&id) else {
            return Ok(false);
        };
        self.names.remove_if(&removed.name, |_, owner| *owner == id);
        self.edges.remove(&id);
        for mut entry in self.edges.iter_mut() {
            entry.value_mut().remove(&id);
        }
        self.parameters.retain(|_, parameter| parameter.template_id != id);
        Ok(true)
    }

    async fn get_outgoing_edges(&self, id: TemplateId) -> StoreResult<Vec<TemplateId>> {
        Ok(self
            .edges
            .get(&id)
            .map(|deps| deps.value().iter().copied().collect())
            .unwrap_or_default())
    }

    async fn get_dependents(&self, id: TemplateId) -> StoreResult<Vec<TemplateId>> {
        let mut dependents: Vec<_> = self
            .edges
            .iter()
            .filter(|entry| entry.value().contains(&id))
            .map(|entry| *entry.key())
            .collect();
        dependents.sort_unstable();
        Ok(dependents)
    }

    async fn replace_outgoing_edges(
        &self,
        id: TemplateId,
        dependencies: &[TemplateId],
    ) -> StoreResult<()> {
        if !self.templates.contains_key(&id) {
            return Err(StoreError::Missing {
                entity: "template",
                id: id.0,
            });
        }
        let set: BTreeSet<TemplateId> = dependencies.iter().copied().collect();
        if set.is_empty() {
            self.edges.remove(&id);
        } else {
            self.edges.insert(id, set);
        }
        Ok(())
    }

    async fn increment_parameter_count(&self, id: TemplateId, delta: i64) -> StoreResult<()> {
        let Some(mut row) = self.templates.get_mut(&id) else {
            return Err(StoreError::Missing {
                entity: "template",
                id: id.0,
            });
        };
        row.parameter_count = row.parameter_count.saturating_add_signed(delta);
        Ok(())
    }

    async fn insert_parameter(&self, parameter: NewParameter) -> StoreResult<Parameter> {
        // Holding the owner's guard until the row is written makes a concurrent
        // `delete_template` wait, so its sweep of parameters sees this one.
        let Some(owner) = self.templates.get(&parameter.template_id) else {
            return Err(StoreError::Missing {
                entity: "template",
                id: parameter.template_id.0,
            });
        };
        let id = ParameterId(self.next_parameter_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let record = Parameter {
            id,
            template_id: parameter.template_id,
            name: parameter.name,
            section: parameter.section,
            kind: parameter.kind,
            assignment_value: parameter.assignment_value,
            drive_io_assignment_value: parameter.drive_io_assignment_value,
            sort_order: parameter.sort_order,
            uploaded_by: parameter.actor.clone(),
            updated_by: parameter.actor,
            uploaded_at: now,
            updated_at: now,
        };
        self.parameters.insert(id, record.clone());
        drop(owner);
        Ok(record)
    }

    async fn get_parameter(&self, id: ParameterId) -> StoreResult<Option<Parameter>> {
        Ok(self.parameters.get(&id).map(|p| p.value().clone()))
    }

    async fn update_parameter(&self, parameter: &Parameter) -> StoreResult<bool> {
        match self.parameters.get_mut(&parameter.id) {
            Some(mut row) => {
                *row = parameter.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_parameter(&self, id: ParameterId) -> StoreResult<Option<Parameter>> {
        Ok(self.parameters.remove(&id).map(|(_, parameter)| parameter))
    }

    async fn list_parameters(&self, template_id: TemplateId) -> StoreResult<Vec<Parameter>> {
        Ok(self
            .parameters
            .iter()
            .filter(|entry| entry.value().template_id == template_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
