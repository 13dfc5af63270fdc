//! Durable persistence boundary.
//!
//! The catalog never talks to a database directly. Everything it needs from
//! durable storage goes through the narrow [`Store`] trait below, so any
//! relational or document store can sit behind it. [`InMemoryStore`] is the
//! implementation used by the CLI and the tests.
//!
//! # Contract
//!
//! - `insert_template` / `update_template` enforce name uniqueness atomically and
//!   report collisions as [`StoreError::NameConflict`].
//! - `delete_template` cascades to the template's parameters and to every edge
//!   where the template is source or target.
//! - `replace_outgoing_edges` swaps a template's dependency set in one step.
//! - `increment_parameter_count` is an atomic adjustment, never a recount.
//!
//! Retries are the store client's business; the catalog propagates
//! [`StoreError::Unavailable`] as-is.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::{NewParameter, NewTemplate, Parameter, ParameterId, Template, TemplateId};
use crate::query::TemplateFilter;

/// Failures reported by a [`Store`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient infrastructure failure.
    #[error("store unavailable during {operation}: {reason}")]
    Unavailable {
        /// Store call that failed
        operation: String,
        /// Reason reported by the client
        reason: String,
    },

    /// Unique name constraint violated.
    #[error("name '{name}' is already taken")]
    NameConflict {
        /// The conflicting name
        name: String,
    },

    /// A record the call relies on does not exist.
    #[error("{entity} {id} does not exist")]
    Missing {
        /// Kind of record
        entity: &'static str,
        /// Identifier that was looked up
        id: u64,
    },
}

impl StoreError {
    /// Build an [`StoreError::Unavailable`] for `operation`.
    pub fn unavailable(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for templates, parameters and dependency edges.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a template by id.
    async fn get_template(&self, id: TemplateId) -> StoreResult<Option<Template>>;

    /// Fetch a template by its unique name.
    async fn get_template_by_name(&self, name: &str) -> StoreResult<Option<Template>>;

    /// All templates matching `filter`, in no particular order.
    async fn list_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<Template>>;

    /// Insert a template, assigning its id and audit fields.
    async fn insert_template(&self, template: NewTemplate) -> StoreResult<Template>;

    /// Overwrite a template row. Returns false when the id does not exist.
    async fn update_template(&self, template: &Template) -> StoreResult<bool>;

    /// Delete a template with its parameters and all incident edges.
    ///
    /// Returns false when the id does not exist.
    async fn delete_template(&self, id: TemplateId) -> StoreResult<bool>;

    /// Dependencies of `id` (edges `id -> x`), sorted.
    async fn get_outgoing_edges(&self, id: TemplateId) -> StoreResult<Vec<TemplateId>>;

    /// Templates depending on `id` (edges `x -> id`), sorted.
    async fn get_dependents(&self, id: TemplateId) -> StoreResult<Vec<TemplateId>>;

    /// Replace every outgoing edge of `id` with `dependencies`.
    async fn replace_outgoing_edges(
        &self,
        id: TemplateId,
        dependencies: &[TemplateId],
    ) -> StoreResult<()>;

    /// Atomically add `delta` to the template's parameter count.
    async fn increment_parameter_count(&self, id: TemplateId, delta: i64) -> StoreResult<()>;

    /// Insert a parameter, assigning its id and audit fields.
    ///
    /// Does not touch the owner's parameter count.
    async fn insert_parameter(&self, parameter: NewParameter) -> StoreResult<Parameter>;

    /// Fetch a parameter by id.
    async fn get_parameter(&self, id: ParameterId) -> StoreResult<Option<Parameter>>;

    /// Overwrite a parameter row. Returns false when the id does not exist.
    async fn update_parameter(&self, parameter: &Parameter) -> StoreResult<bool>;

    /// Remove a parameter, returning it if it existed.
    ///
    /// Does not touch the owner's parameter count.
    async fn delete_parameter(&self, id: ParameterId) -> StoreResult<Option<Parameter>>;

    /// Parameters owned by `template_id`, in no particular order.
    async fn list_parameters(&self, template_id: TemplateId) -> StoreResult<Vec<Parameter>>;
}
