//! Template dependency graph.
//!
//! An edge `A -> B` means "A depends on B". The full edge set must stay acyclic.
//!
//! - [`cycle`] - pure cycle check for a proposed dependency set over a snapshot
//! - [`dag`] - petgraph view for build order, transitive closure and tree output
//! - [`service`] - [`DependencyGraphService`], the only component that commits edges

pub mod cycle;
pub mod dag;
pub mod service;

pub use cycle::{AdjacencySnapshot, detect_cycle};
pub use dag::DependencyDag;
pub use service::DependencyGraphService;
