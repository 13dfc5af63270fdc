//! petgraph view of a dependency snapshot.
//!
//! Used for whole-graph questions that the incremental check in
//! [`super::cycle`] does not answer: build order, transitive closure and the
//! printable tree.

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::cycle::{AdjacencySnapshot, detect_cycle};
use crate::core::{CatalogError, CatalogResult, TemplateId};

/// Directed graph of templates, `from -> to` meaning "from depends on to".
#[derive(Debug, Clone, Default)]
pub struct DependencyDag {
    graph: DiGraph<TemplateId, ()>,
    node_map: HashMap<TemplateId, NodeIndex>,
    labels: HashMap<TemplateId, String>,
}

impl DependencyDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a snapshot, adding nodes in ascending id order.
    pub fn from_snapshot(snapshot: &AdjacencySnapshot) -> Self {
        let mut dag = Self::new();
        for id in snapshot.nodes() {
            dag.ensure_node(id);
        }
        for (from, to) in snapshot.edges() {
            dag.add_dependency(from, to);
        }
        dag
    }

    fn ensure_node(&mut self, id: TemplateId) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&id) {
            index
        } else {
            let index = self.graph.add_node(id);
            self.node_map.insert(id, index);
            index
        }
    }

    /// Add `from -> to`, ignoring duplicates.
    pub fn add_dependency(&mut self, from: TemplateId, to: TemplateId) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Attach a display name used by [`DependencyDag::to_tree_string`].
    pub fn set_label(&mut self, id: TemplateId, label: impl Into<String>) {
        self.ensure_node(id);
        self.labels.insert(id, label.into());
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Direct dependencies of `id`, ascending.
    pub fn direct_dependencies(&self, id: TemplateId) -> Vec<TemplateId> {
        let mut deps: Vec<TemplateId> = match self.node_map.get(&id) {
            Some(&index) => self.graph.neighbors(index).map(|n| self.graph[n]).collect(),
            None => Vec::new(),
        };
        deps.sort_unstable();
        deps
    }

    /// Everything `id` depends on, directly or not (excluding `id` itself).
    pub fn transitive_dependencies(&self, id: TemplateId) -> BTreeSet<TemplateId> {
        let mut deps = BTreeSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.node_map.get(&id) {
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors(current) {
                    if deps.insert(self.graph[neighbor]) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        deps.remove(&id);
        deps
    }

    /// All nodes ordered so that every dependency precedes its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CycleDetected`] with a full cycle path if the graph
    /// is not a DAG.
    pub fn topological_order(&self) -> CatalogResult<Vec<TemplateId>> {
        match toposort(&self.graph, None) {
            // toposort puts dependents first; reverse so dependencies come first
            Ok(indices) => Ok(indices.into_iter().rev().map(|idx| self.graph[idx]).collect()),
            Err(cycle) => Err(self.cycle_through(self.graph[cycle.node_id()])),
        }
    }

    /// `root` and its transitive dependencies, dependencies first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CycleDetected`] if the graph is not a DAG.
    pub fn dependency_order(&self, root: TemplateId) -> CatalogResult<Vec<TemplateId>> {
        let mut wanted = self.transitive_dependencies(root);
        wanted.insert(root);
        let order = self.topological_order()?;
        Ok(order.into_iter().filter(|id| wanted.contains(id)).collect())
    }

    fn cycle_through(&self, node: TemplateId) -> CatalogError {
        let snapshot = AdjacencySnapshot::from_edges(
            self.graph.edge_indices().filter_map(|e| self.graph.edge_endpoints(e)).map(
                |(from, to)| (self.graph[from], self.graph[to]),
            ),
        );
        let deps: Vec<TemplateId> = snapshot.dependencies(node).collect();
        let path = match detect_cycle(&snapshot, node, &deps) {
            Err(path) => path,
            Ok(()) => vec![node, node],
        };
        CatalogError::CycleDetected { path }
    }

    fn label(&self, id: TemplateId) -> String {
        match self.labels.get(&id) {
            Some(name) => format!("{name} (#{id})"),
            None => format!("#{id}"),
        }
    }

    /// Render the dependencies of `root` as a tree.
    ///
    /// A template reachable along several paths is expanded once; later
    /// occurrences are marked `(see above)`.
    pub fn to_tree_string(&self, root: TemplateId) -> String {
        let mut result = format!("{}\n", self.label(root));
        let mut expanded = HashSet::new();
        let mut ancestors = vec![root];
        expanded.insert(root);

        let deps = self.direct_dependencies(root);
        for (i, dep) in deps.iter().enumerate() {
            let is_last = i == deps.len() - 1;
            self.build_tree_string(*dep, &mut result, "", is_last, &mut expanded, &mut ancestors);
        }
        result
    }

    fn build_tree_string(
        &self,
        node: TemplateId,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        expanded: &mut HashSet<TemplateId>,
        ancestors: &mut Vec<TemplateId>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        if ancestors.contains(&node) {
            result.push_str(&format!("{prefix}{connector}{} (circular reference)\n", self.label(node)));
            return;
        }
        if !expanded.insert(node) {
            let deps = self.direct_dependencies(node);
            let marker = if deps.is_empty() {
                ""
            } else {
                " (see above)"
            };
            result.push_str(&format!("{prefix}{connector}{}{marker}\n", self.label(node)));
            return;
        }

        result.push_str(&format!("{prefix}{connector}{}\n", self.label(node)));
        ancestors.push(node);
        let deps = self.direct_dependencies(node);
        for (i, dep) in deps.iter().enumerate() {
            let is_last_child = i == deps.len() - 1;
            self.build_tree_string(*dep, result, &child_prefix, is_last_child, expanded, ancestors);
        }
        ancestors.pop();
    }
}
