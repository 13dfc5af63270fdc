//! Shared setup for CLI commands

use anyhow::{Context, Result};
use std::collections::HashMap;

use super::CliConfig;
use crate::catalog_file::{CatalogFile, NameIndex};
use crate::config::CatalogConfig;
use crate::core::{CatalogError, TemplateDetail, TemplateId};
use crate::service::TemplateService;

/// Actor recorded on templates loaded from a catalog file.
const FILE_ACTOR: &str = "ccat";

/// A catalog file loaded into an in-memory [`TemplateService`].
pub struct CatalogSession {
    pub service: TemplateService,
    pub file: CatalogFile,
    pub index: NameIndex,
    names: HashMap<TemplateId, String>,
}

impl CatalogSession {
    /// Load config and catalog, then replay the catalog into a fresh service.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be loaded or the catalog is invalid.
    pub async fn open(config: &CliConfig) -> Result<Self> {
        let settings = CatalogConfig::load_with_optional(config.config_path.clone()).await?;
        let file = CatalogFile::load(&config.catalog_path).await?;
        let service = TemplateService::in_memory(&settings);
        let index = file.seed(&service, FILE_ACTOR).await.with_context(|| {
            format!("Catalog {} is invalid", config.catalog_path.display())
        })?;
        let names = index.iter().map(|(name, id)| (*id, name.clone())).collect();

        Ok(Self {
            service,
            file,
            index,
            names,
        })
    }

    /// Id of the template called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NameNotFound`] for an unknown name.
    pub fn id_of(&self, name: &str) -> Result<TemplateId, CatalogError> {
        self.index.get(name).copied().ok_or_else(|| CatalogError::NameNotFound {
            name: name.to_string(),
        })
    }

    /// Name of `id`, or `#id` when it is not from the file.
    pub fn name_of(&self, id: TemplateId) -> String {
        self.names.get(&id).cloned().unwrap_or_else(|| format!("#{id}"))
    }

    /// Names of `ids`, in the given order.
    pub fn names_of(&self, ids: &[TemplateId]) -> Vec<String> {
        ids.iter().map(|id| self.name_of(*id)).collect()
    }

    /// Look a template up by name.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown name.
    pub async fn detail(&self, name: &str) -> Result<TemplateDetail> {
        Ok(self.service.get(self.id_of(name)?).await?)
    }
}
