//! Core types for the cluster catalog
//!
//! This module defines the records the rest of the crate moves around and the
//! error type every operation returns.
//!
//! # Modules
//!
//! - `template` - [`Template`], [`TemplateId`] and the create/update/listing shapes
//! - `parameter` - [`Parameter`] and its create/update shapes
//! - `error` - [`CatalogError`], [`ErrorContext`] and [`user_friendly_error`]

pub mod error;
mod parameter;
mod template;

pub use error::{CatalogError, ErrorContext, user_friendly_error};
pub use parameter::{AssignmentUpdate, NewParameter, Parameter, ParameterId, ParameterUpdate};
pub use template::{
    DependencyChange, NewTemplate, Template, TemplateDetail, TemplateId, TemplateSummary,
    TemplateUpdate,
};

/// Result alias used by catalog services.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
