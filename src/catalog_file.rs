//! TOML catalog snapshots.
//!
//! The CLI works on a catalog stored in a single TOML file. Loading a file
//! replays it through [`TemplateService`], so a file that contains a cycle or a
//! dangling dependency is rejected with the same errors an API caller would get.
//!
//! ```toml
//! [[templates]]
//! name = "Pump"
//! segment = "Water"
//! block_type = "FB"
//! control_library = "core"
//! payload = "NETWORK 1 ..."
//! depends_on = ["Motor"]
//!
//! [[templates.parameters]]
//! name = "Speed"
//! kind = "REAL"
//! sort_order = 1
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::core::{CatalogError, NewParameter, NewTemplate, TemplateId};
use crate::service::TemplateService;

/// Whole catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,
}

/// One `[[templates]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateEntry {
    pub name: String,
    #[serde(default)]
    pub segment: String,
    #[serde(default)]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_library: Option<String>,
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub protected: bool,
    /// Names of the templates this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterEntry>,
}

/// One `[[templates.parameters]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterEntry {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_io_assignment_value: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Name to id mapping of a catalog loaded into a service.
pub type NameIndex = HashMap<String, TemplateId>;

impl CatalogFile {
    /// Read and parse a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid catalog.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse catalog {}", path.display()))
    }

    /// Parse catalog TOML.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML or unknown keys.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write the catalog back as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize catalog")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write catalog to {}", path.display()))
    }

    pub fn entry(&self, name: &str) -> Option<&TemplateEntry> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Replace the `depends_on` list of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NameNotFound`] if no entry has that name.
    pub fn set_depends_on(
        &mut self,
        name: &str,
        depends_on: Vec<String>,
    ) -> Result<(), CatalogError> {
        match self.templates.iter_mut().find(|t| t.name == name) {
            Some(entry) => {
                entry.depends_on = depends_on;
                Ok(())
            }
            None => Err(CatalogError::NameNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Create every template and parameter in `service`, then apply dependencies.
    ///
    /// All templates are created before any dependency is set, so entries may
    /// reference templates declared later in the file.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending template if a name is duplicated,
    /// a dependency is unknown, or the dependencies contain a cycle.
    pub async fn seed(&self, service: &TemplateService, actor: &str) -> Result<NameIndex> {
        let mut index = NameIndex::with_capacity(self.templates.len());

        for entry in &self.templates {
            let mut template = NewTemplate::new(&entry.name, &entry.payload)
                .with_segment(&entry.segment)
                .with_block_type(&entry.block_type)
                .protected(entry.protected)
                .by(actor);
            template.control_library.clone_from(&entry.control_library);

            let id = service
                .create(template)
                .await
                .with_context(|| format!("Failed to load template '{}'", entry.name))?;
            index.insert(entry.name.clone(), id);

            if !entry.parameters.is_empty() {
                let parameters = entry
                    .parameters
                    .iter()
                    .map(|p| NewParameter {
                        template_id: id,
                        name: p.name.clone(),
                        section: p.section.clone(),
                        kind: p.kind.clone(),
                        assignment_value: p.assignment_value.clone(),
                        drive_io_assignment_value: p.drive_io_assignment_value.clone(),
                        sort_order: p.sort_order,
                        actor: actor.to_string(),
                    })
                    .collect();
                service.add_parameters(parameters).await.with_context(|| {
                    format!("Failed to load parameters of template '{}'", entry.name)
                })?;
            }
        }

        for entry in &self.templates {
            let Some(&id) = index.get(&entry.name) else {
                continue;
            };
            if entry.depends_on.is_empty() {
                continue;
            }
            let deps = resolve_names(&index, &entry.depends_on)
                .with_context(|| format!("Invalid dependencies of template '{}'", entry.name))?;
            service
                .set_dependencies(id, &deps)
                .await
                .with_context(|| format!("Invalid dependencies of template '{}'", entry.name))?;
        }

        debug!("Seeded {} templates from catalog file", index.len());
        Ok(index)
    }
}

/// Map template names to ids.
///
/// # Errors
///
/// Returns [`CatalogError::NameNotFound`] for the first unknown name.
pub fn resolve_names(index: &NameIndex, names: &[String]) -> Result<Vec<TemplateId>, CatalogError> {
    names
        .iter()
        .map(|name| {
            index.get(name).copied().ok_or_else(|| CatalogError::NameNotFound {
                name: name.clone(),
            })
        })
        .collect()
}
