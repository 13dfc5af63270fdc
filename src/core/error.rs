//! Error handling for the cluster catalog
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can tell "your input was invalid" apart from
//!    "try again later"
//! 2. **User-friendly messages** with actionable suggestions for the CLI
//!
//! # Architecture
//!
//! - [`CatalogError`] - every failure a catalog operation can surface
//! - [`ErrorContext`] - wrapper that adds details and a suggestion for display
//! - [`user_friendly_error`] - converts any [`anyhow::Error`] into an [`ErrorContext`]
//!
//! # Error Categories
//!
//! - **Invalid input**: [`CatalogError::NotFound`], [`CatalogError::DuplicateName`],
//!   [`CatalogError::CycleDetected`], [`CatalogError::HasDependents`],
//!   [`CatalogError::InvalidInput`]
//! - **Infrastructure**: [`CatalogError::StoreUnavailable`], [`CatalogError::CacheUnavailable`]
//! - **Configuration**: [`CatalogError::Config`]
//!
//! Cache failures on read and mutation paths never reach callers: a failed cache read is
//! a miss and a failed cache write is logged and dropped. Only APIs that operate on the
//! cache itself return [`CatalogError::CacheUnavailable`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use cluster_catalog::core::{CatalogError, ErrorContext, TemplateId};
//!
//! let error = CatalogError::CycleDetected {
//!     path: vec![TemplateId(3), TemplateId(1), TemplateId(2), TemplateId(3)],
//! };
//! assert!(error.is_invalid_input());
//!
//! let context = ErrorContext::new(error)
//!     .with_suggestion("Remove one of the dependencies on the cycle");
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use super::template::TemplateId;
use crate::cache::CacheError;
use crate::store::StoreError;

/// The main error type for catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A referenced template, dependency or parameter does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record (`template`, `parameter`)
        entity: &'static str,
        /// Identifier that was looked up
        id: u64,
    },

    /// No template carries the given name.
    #[error("Template '{name}' not found")]
    NameNotFound {
        /// Name that was looked up
        name: String,
    },

    /// A create or rename collides with an existing unique name.
    #[error("A template named '{name}' already exists")]
    DuplicateName {
        /// The conflicting name
        name: String,
    },

    /// The requested dependency set would introduce a cycle.
    ///
    /// `path` starts and ends with the same template, e.g. `[C, A, B, C]` for
    /// `C → A → B → C`. Nothing was committed.
    #[error("Circular dependency detected: {}", format_path(path))]
    CycleDetected {
        /// Templates on the cycle, first element repeated at the end
        path: Vec<TemplateId>,
    },

    /// Deletion refused because other templates still depend on this one.
    ///
    /// Only returned when the graph is configured with `delete_policy = "reject"`.
    #[error("Template {id} is still required by {}", format_ids(dependents))]
    HasDependents {
        /// Template that was to be deleted
        id: TemplateId,
        /// Templates with an edge to `id`
        dependents: Vec<TemplateId>,
    },

    /// Input failed validation before reaching the store.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },

    /// The durable store failed. The operation had no effect or must be retried.
    #[error("Store unavailable during {operation}: {reason}")]
    StoreUnavailable {
        /// Store call that failed
        operation: String,
        /// Reason reported by the store client
        reason: String,
    },

    /// The cache failed on an operation that targets the cache directly.
    #[error("Cache unavailable during {operation}: {reason}")]
    CacheUnavailable {
        /// Cache call that failed
        operation: String,
        /// Reason reported by the cache client
        reason: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl CatalogError {
    /// Shorthand for a missing template.
    #[must_use]
    pub const fn template_not_found(id: TemplateId) -> Self {
        Self::NotFound {
            entity: "template",
            id: id.0,
        }
    }

    /// True for transient infrastructure failures ("try again later").
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::CacheUnavailable { .. })
    }

    /// True for errors caused by the caller's input.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NameNotFound { .. }
                | Self::DuplicateName { .. }
                | Self::CycleDetected { .. }
                | Self::HasDependents { .. }
                | Self::InvalidInput { .. }
        )
    }
}

fn format_path(path: &[TemplateId]) -> String {
    path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
}

fn format_ids(ids: &[TemplateId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl From<StoreError> for CatalogError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable {
                operation,
                reason,
            } => Self::StoreUnavailable {
                operation,
                reason,
            },
            StoreError::NameConflict {
                name,
            } => Self::DuplicateName {
                name,
            },
            StoreError::Missing {
                entity,
                id,
            } => Self::NotFound {
                entity,
                id,
            },
        }
    }
}

impl From<CacheError> for CatalogError {
    fn from(error: CacheError) -> Self {
        match error {
            CacheError::Unavailable {
                operation,
                reason,
            } => Self::CacheUnavailable {
                operation,
                reason,
            },
            CacheError::Codec {
                key,
                reason,
            } => Self::CacheUnavailable {
                operation: format!("codec {key}"),
                reason,
            },
        }
    }
}

/// Error with user-facing context.
///
/// Wraps a [`CatalogError`] with optional details (why it happened) and a
/// suggestion (what to do about it). The CLI prints these with colors.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying catalog error
    pub error: CatalogError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CatalogError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`CatalogError`], [`std::io::Error`] and [`toml::de::Error`]; anything
/// else is reported with its full `anyhow` chain as details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(catalog_error) = error.downcast_ref::<CatalogError>() {
        let mut context = create_error_context(catalog_error.clone());
        // Context attached above the catalog error, e.g. names for a cycle path
        let outer: Vec<String> = error
            .chain()
            .take_while(|cause| cause.downcast_ref::<CatalogError>().is_none())
            .map(ToString::to_string)
            .collect();
        if !outer.is_empty() {
            let mut details = outer.join(": ");
            if let Some(existing) = context.details.take() {
                details = format!("{details}. {existing}");
            }
            context.details = Some(details);
        }
        return context;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return ErrorContext::new(CatalogError::InvalidInput {
            reason: io_error.to_string(),
        })
        .with_suggestion("Check that the catalog file exists and is readable");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(CatalogError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the file");
    }

    let chain = error.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>();
    let context = ErrorContext::new(CatalogError::InvalidInput {
        reason: error.to_string(),
    });
    if chain.is_empty() {
        context
    } else {
        context.with_details(chain.join(": "))
    }
}

fn create_error_context(error: CatalogError) -> ErrorContext {
    match &error {
        CatalogError::NotFound {
            entity,
            ..
        } => {
            let details = format!("The {entity} may have been deleted by another request");
            ErrorContext::new(error)
                .with_suggestion("Check the identifier with 'ccat list'")
                .with_details(details)
        }
        CatalogError::NameNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Names are case-sensitive; run 'ccat list' to see every template"),
        CatalogError::DuplicateName {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Choose a different name or update the existing template")
            .with_details("Template names are unique across the catalog"),
        CatalogError::CycleDetected {
            path,
        } => {
            let culprit = path.get(1).map_or_else(String::new, ToString::to_string);
            ErrorContext::new(error)
                .with_suggestion(format!(
                    "Remove the dependency on template {culprit} or break the chain elsewhere"
                ))
                .with_details(
                    "Templates cannot depend on themselves directly or indirectly; no edges were changed",
                )
        }
        CatalogError::HasDependents {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Remove the dependency from the listed templates first")
            .with_details("The catalog is configured to refuse deleting templates that are still depended upon"),
        CatalogError::StoreUnavailable {
            ..
        }
        | CatalogError::CacheUnavailable {
            ..
        } => ErrorContext::new(error).with_suggestion("This is a transient failure, try again later"),
        CatalogError::Config {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the configuration file referenced by CCAT_CONFIG_PATH"),
        CatalogError::InvalidInput {
            ..
        } => ErrorContext::new(error),
    }
}
