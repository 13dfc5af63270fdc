//! Cluster Catalog - cluster template storage with dependency validation
//!
//! A catalog of cluster templates (reusable automation building blocks) that may
//! depend on each other. The crate keeps the dependency graph acyclic under
//! concurrent edits and serves list queries from a versioned cache that is
//! invalidated in O(1) by bumping a counter.
//!
//! # Architecture Overview
//!
//! ```text
//!                TemplateService (service)
//!               /          |             \
//!   QueryService     DependencyGraphService   parameters
//!     (query)              (graph)
//!          \               /      \
//!        VersionedCache (cache)    Store (store)
//! ```
//!
//! - Writes go to the [`store::Store`], then bump the list version and drop the
//!   affected instance entries.
//! - Dependency changes run under one catalog-wide lock: snapshot, cycle check and
//!   commit happen without interleaving.
//! - Cache failures degrade to store reads; store failures are errors.
//!
//! # Core Modules
//!
//! - [`core`] - records, inputs and [`core::CatalogError`]
//! - [`store`] - durable store trait and the in-memory implementation
//! - [`cache`] - cache trait, in-memory TTL cache and versioned key scheme
//! - [`graph`] - cycle detection, dependency graph service and petgraph views
//! - [`query`] - filters and cached listings
//! - [`service`] - the [`service::TemplateService`] façade
//! - [`config`] - TOML configuration (`~/.ccat/config.toml`)
//! - [`catalog_file`] - TOML catalog snapshots used by the CLI
//! - [`cli`] - the `ccat` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use cluster_catalog::config::CatalogConfig;
//! use cluster_catalog::core::NewTemplate;
//! use cluster_catalog::service::TemplateService;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = TemplateService::in_memory(&CatalogConfig::default());
//! let pump = service.create(NewTemplate::new("Pump", "NETWORK 1")).await?;
//! let motor = service.create(NewTemplate::new("Motor", "NETWORK 1")).await?;
//!
//! service.set_dependencies(pump, &[motor]).await?;
//! // Motor → Pump would close a cycle and is rejected without committing
//! assert!(service.set_dependencies(motor, &[pump]).await.is_err());
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cache;
pub mod config;
pub mod core;
pub mod graph;
pub mod query;
pub mod service;
pub mod store;

// Command line
pub mod catalog_file;
pub mod cli;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
