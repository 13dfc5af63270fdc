//! Parameters owned by cluster templates.
//!
//! Parameters never take part in the dependency graph. Their only coupling to the
//! owning template is the denormalized `parameter_count`, which the store adjusts
//! with atomic increments as parameters come and go.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::template::TemplateId;

/// Unique identity of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterId(pub u64);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, typed assignment slot on a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: ParameterId,
    pub template_id: TemplateId,
    pub name: String,
    /// Section of the template the parameter is rendered into.
    pub section: String,
    /// Data type tag (e.g. `BOOL`, `REAL`).
    pub kind: String,
    pub assignment_value: Option<String>,
    /// Assignment used when the template drives IO directly.
    pub drive_io_assignment_value: Option<String>,
    pub sort_order: i32,
    pub uploaded_by: String,
    pub updated_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParameter {
    pub template_id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub assignment_value: Option<String>,
    #[serde(default)]
    pub drive_io_assignment_value: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub actor: String,
}

impl NewParameter {
    pub fn new(template_id: TemplateId, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            template_id,
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.assignment_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn at(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}

/// Partial update of a parameter. Ownership cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub name: Option<String>,
    pub section: Option<String>,
    pub kind: Option<String>,
    pub assignment_value: Option<Option<String>>,
    pub drive_io_assignment_value: Option<Option<String>>,
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub actor: String,
}

impl ParameterUpdate {
    #[must_use]
    pub fn apply_to(&self, parameter: &Parameter, now: DateTime<Utc>) -> Parameter {
        let mut updated = parameter.clone();
        if let Some(name) = &self.name {
            updated.name.clone_from(name);
        }
        if let Some(section) = &self.section {
            updated.section.clone_from(section);
        }
        if let Some(kind) = &self.kind {
            updated.kind.clone_from(kind);
        }
        if let Some(value) = &self.assignment_value {
            updated.assignment_value.clone_from(value);
        }
        if let Some(value) = &self.drive_io_assignment_value {
            updated.drive_io_assignment_value.clone_from(value);
        }
        if let Some(order) = self.sort_order {
            updated.sort_order = order;
        }
        updated.updated_by.clone_from(&self.actor);
        updated.updated_at = now;
        updated
    }
}

/// One entry of a bulk assignment update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentUpdate {
    pub id: ParameterId,
    pub assignment_value: Option<String>,
}
