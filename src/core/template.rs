//! Cluster template records and the shapes used to create and change them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique integer identity of a cluster template.
///
/// Identifiers are assigned by the store on insert and never reused.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TemplateId(pub u64);

impl TemplateId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TemplateId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A reusable automation building block.
///
/// The payload is opaque to this crate: it is stored and returned, never interpreted.
/// `parameter_count` is denormalized from the template's parameters and is only ever
/// changed through atomic increments in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Store-assigned identity.
    pub id: TemplateId,
    /// Unique human-readable name.
    pub name: String,
    /// Generated/configured content.
    pub payload: String,
    /// Category label used by the segment dashboard and filters.
    pub segment: String,
    /// Block type tag (e.g. `FB`, `UDT`).
    pub block_type: String,
    /// Control library the template belongs to, if any.
    pub control_library: Option<String>,
    /// Protected templates must not be mutated by non-privileged callers.
    ///
    /// Enforcement happens in the calling layer; the catalog only carries the flag.
    pub protected: bool,
    /// Number of parameters owned by this template.
    pub parameter_count: u64,
    /// Actor that created the template.
    pub uploaded_by: String,
    /// Actor that last changed the template.
    pub updated_by: String,
    /// Creation time.
    pub uploaded_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub payload: String,
    #[serde(default)]
    pub segment: String,
    #[serde(default)]
    pub block_type: String,
    #[serde(default)]
    pub control_library: Option<String>,
    #[serde(default)]
    pub protected: bool,
    /// Actor recorded as both uploader and last updater.
    #[serde(default)]
    pub actor: String,
}

impl NewTemplate {
    /// Minimal template with a name and payload; every other field defaults.
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = segment.into();
        self
    }

    #[must_use]
    pub fn with_block_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = block_type.into();
        self
    }

    #[must_use]
    pub fn with_control_library(mut self, library: impl Into<String>) -> Self {
        self.control_library = Some(library.into());
        self
    }

    #[must_use]
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    #[must_use]
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}

/// Partial update of a template. `None` leaves a field untouched.
///
/// `control_library` uses a nested option so that it can be cleared
/// (`Some(None)`) as well as left alone (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub payload: Option<String>,
    pub segment: Option<String>,
    pub block_type: Option<String>,
    pub control_library: Option<Option<String>>,
    pub protected: Option<bool>,
    #[serde(default)]
    pub actor: String,
}

impl TemplateUpdate {
    /// True when the update would not change any field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.payload.is_none()
            && self.segment.is_none()
            && self.block_type.is_none()
            && self.control_library.is_none()
            && self.protected.is_none()
    }

    /// Apply the update to a copy of `template`, stamping the actor and time.
    #[must_use]
    pub fn apply_to(&self, template: &Template, now: DateTime<Utc>) -> Template {
        let mut updated = template.clone();
        if let Some(name) = &self.name {
            updated.name.clone_from(name);
        }
        if let Some(payload) = &self.payload {
            updated.payload.clone_from(payload);
        }
        if let Some(segment) = &self.segment {
            updated.segment.clone_from(segment);
        }
        if let Some(block_type) = &self.block_type {
            updated.block_type.clone_from(block_type);
        }
        if let Some(library) = &self.control_library {
            updated.control_library.clone_from(library);
        }
        if let Some(protected) = self.protected {
            updated.protected = protected;
        }
        updated.updated_by.clone_from(&self.actor);
        updated.updated_at = now;
        updated
    }
}

/// A template together with its live dependency list.
///
/// The dependency list is always resolved from the store at read time and never
/// served from a cached blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDetail {
    pub template: Template,
    pub dependencies: Vec<TemplateId>,
}

/// Compact listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub name: String,
    pub block_type: String,
    pub control_library: Option<String>,
    pub dependencies: Vec<TemplateId>,
}

/// Result of a dependency-set operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChange {
    pub template_id: TemplateId,
    /// Dependencies now stored for the template, sorted.
    pub dependencies: Vec<TemplateId>,
    /// False when the requested set equalled the stored one and nothing was written.
    pub changed: bool,
}
