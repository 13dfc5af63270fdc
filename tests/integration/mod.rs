//! Integration test suite for the cluster catalog
//!
//! End-to-end tests over the public API and the `ccat` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenarios**: end-to-end catalog workflows
//! - **cache_staleness**: list results never outlive a version bump
//! - **graph_properties**: acyclicity, self-reference and idempotence properties
//! - **concurrency**: racing writers and version counters
//! - **parameters**: parameter counts and cached parameter listings
//! - **degradation**: failing cache and store backends
//! - **cli**: the `ccat` command line

mod cache_staleness;
mod cli;
mod concurrency;
mod degradation;
mod graph_properties;
mod parameters;
mod scenarios;
