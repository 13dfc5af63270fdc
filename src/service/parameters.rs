//! Parameter operations on [`TemplateService`].
//!
//! Every insert and removal adjusts the owner's `parameter_count` through
//! [`crate::store::Store::increment_parameter_count`]; nothing ever recounts.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

use super::TemplateService;
use crate::cache::InstanceKind;
use crate::core::{
    AssignmentUpdate, CatalogError, CatalogResult, NewParameter, Parameter, ParameterId,
    ParameterUpdate, TemplateId,
};

fn parameter_not_found(id: ParameterId) -> CatalogError {
    CatalogError::NotFound {
        entity: "parameter",
        id: id.0,
    }
}

fn validate_parameter_name(name: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidInput {
            reason: "parameter name must not be empty".to_string(),
        });
    }
    Ok(())
}

impl TemplateService {
    /// Add one parameter to its template.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the owning template does not exist
    /// - [`CatalogError::InvalidInput`] for a blank name
    pub async fn add_parameter(&self, parameter: NewParameter) -> CatalogResult<Parameter> {
        validate_parameter_name(&parameter.name)?;
        self.require_template(parameter.template_id).await?;
        self.insert_counted(parameter).await
    }

    /// Add several parameters, possibly to different templates.
    ///
    /// Every name and owner is validated before anything is inserted.
    ///
    /// # Errors
    ///
    /// Same as [`TemplateService::add_parameter`], reported for the first bad entry.
    pub async fn add_parameters(
        &self,
        parameters: Vec<NewParameter>,
    ) -> CatalogResult<Vec<Parameter>> {
        let mut owners = BTreeSet::new();
        for parameter in &parameters {
            validate_parameter_name(&parameter.name)?;
            owners.insert(parameter.template_id);
        }
        for owner in &owners {
            self.require_template(*owner).await?;
        }

        let mut created = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            created.push(self.insert_counted(parameter).await?);
        }
        info!("Added {} parameters to {} templates", created.len(), owners.len());
        Ok(created)
    }

    /// Apply a partial update to a parameter.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the parameter does not exist
    /// - [`CatalogError::InvalidInput`] for a blank new name
    pub async fn update_parameter(
        &self,
        id: ParameterId,
        update: ParameterUpdate,
    ) -> CatalogResult<Parameter> {
        if let Some(name) = &update.name {
            validate_parameter_name(name)?;
        }
        let current =
            self.store.get_parameter(id).await?.ok_or_else(|| parameter_not_found(id))?;
        let updated = update.apply_to(&current, Utc::now());
        if !self.store.update_parameter(&updated).await? {
            return Err(parameter_not_found(id));
        }
        self.cache.invalidate_instance(InstanceKind::Parameters, updated.template_id.get()).await;
        Ok(updated)
    }

    /// Remove a parameter and decrement its owner's count.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the parameter does not exist.
    pub async fn remove_parameter(&self, id: ParameterId) -> CatalogResult<Parameter> {
        let removed =
            self.store.delete_parameter(id).await?.ok_or_else(|| parameter_not_found(id))?;
        self.store.increment_parameter_count(removed.template_id, -1).await?;
        self.invalidate_owner(removed.template_id).await;
        Ok(removed)
    }

    /// Set the assignment value of several parameters at once.
    ///
    /// All ids are checked before any change is written. Returns how many
    /// parameters were updated.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for the first unknown id; nothing is written.
    pub async fn bulk_update_assignments(
        &self,
        updates: Vec<AssignmentUpdate>,
        actor: &str,
    ) -> CatalogResult<usize> {
        let mut current: HashMap<ParameterId, Parameter> = HashMap::with_capacity(updates.len());
        for update in &updates {
            if current.contains_key(&update.id) {
                continue;
            }
            let parameter = self
                .store
                .get_parameter(update.id)
                .await?
                .ok_or_else(|| parameter_not_found(update.id))?;
            current.insert(update.id, parameter);
        }

        let now = Utc::now();
        let mut owners = BTreeSet::new();
        for update in &updates {
            let Some(parameter) = current.get_mut(&update.id) else {
                continue;
            };
            parameter.assignment_value.clone_from(&update.assignment_value);
            parameter.updated_by = actor.to_string();
            parameter.updated_at = now;
            owners.insert(parameter.template_id);
        }
        for parameter in current.values() {
            if !self.store.update_parameter(parameter).await? {
                return Err(parameter_not_found(parameter.id));
            }
        }
        for owner in owners {
            self.cache.invalidate_instance(InstanceKind::Parameters, owner.get()).await;
        }

        info!("Updated assignments of {} parameters", current.len());
        Ok(current.len())
    }

    /// Parameters of a template, by sort order then id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the template does not exist.
    pub async fn list_parameters(&self, template_id: TemplateId) -> CatalogResult<Vec<Parameter>> {
        if let Some(cached) = self
            .cache
            .get_instance::<Vec<Parameter>>(InstanceKind::Parameters, template_id.get())
            .await
        {
            return Ok(cached);
        }

        self.require_template(template_id).await?;
        let mut parameters = self.store.list_parameters(template_id).await?;
        parameters.sort_by_key(|p| (p.sort_order, p.id));
        self.cache
            .set_instance(
                InstanceKind::Parameters,
                template_id.get(),
                &parameters,
                self.settings.parameters_ttl(),
            )
            .await;
        Ok(parameters)
    }

    async fn require_template(&self, id: TemplateId) -> CatalogResult<()> {
        match self.store.get_template(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::template_not_found(id)),
        }
    }

    async fn insert_counted(&self, parameter: NewParameter) -> CatalogResult<Parameter> {
        let created = self.store.insert_parameter(parameter).await?;
        self.store.increment_parameter_count(created.template_id, 1).await?;
        self.invalidate_owner(created.template_id).await;
        Ok(created)
    }

    /// The owner's record carries `parameter_count`, so both keys go.
    async fn invalidate_owner(&self, owner: TemplateId) {
        self.cache.invalidate_instance(InstanceKind::Parameters, owner.get()).await;
        self.cache.invalidate_instance(InstanceKind::Template, owner.get()).await;
    }
}
