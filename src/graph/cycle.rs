//! Cycle detection for a proposed dependency set.
//!
//! [`detect_cycle`] is a pure function over an [`AdjacencySnapshot`]: it never
//! touches the store, and the same inputs always give the same answer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::TemplateId;

/// Point-in-time copy of (part of) the dependency relation.
///
/// Maps a template to the templates it depends on. Templates absent from the map
/// are treated as having no dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencySnapshot {
    edges: BTreeMap<TemplateId, BTreeSet<TemplateId>>,
}

impl AdjacencySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(from, to)` pairs.
    pub fn from_edges(edges: impl IntoIterator<Item = (TemplateId, TemplateId)>) -> Self {
        let mut snapshot = Self::new();
        for (from, to) in edges {
            snapshot.edges.entry(from).or_default().insert(to);
        }
        snapshot
    }

    /// Record the full dependency set of `id`, replacing anything recorded before.
    pub fn insert(&mut self, id: TemplateId, dependencies: impl IntoIterator<Item = TemplateId>) {
        self.edges.insert(id, dependencies.into_iter().collect());
    }

    /// Whether the dependency set of `id` has been recorded.
    pub fn contains(&self, id: TemplateId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Recorded dependencies of `id`, sorted.
    pub fn dependencies(&self, id: TemplateId) -> impl Iterator<Item = TemplateId> + '_ {
        self.edges.get(&id).into_iter().flat_map(|deps| deps.iter().copied())
    }

    /// Every recorded template, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.edges.keys().copied()
    }

    /// Every recorded edge as `(from, to)`, sorted.
    pub fn edges(&self) -> impl Iterator<Item = (TemplateId, TemplateId)> + '_ {
        self.edges.iter().flat_map(|(from, deps)| deps.iter().map(move |to| (*from, *to)))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// On the current DFS path.
    Gray,
    /// Fully explored without reaching the target.
    Black,
}

/// Check whether giving `target` exactly the dependencies `candidates` would close a cycle.
///
/// The outgoing edges of `target` in `snapshot` are ignored and replaced by
/// `candidates` (deduplicated). Returns `Err(path)` with the first cycle found,
/// starting and ending at `target`, e.g. `[C, A, B, C]`. A self-dependency is
/// reported as `[target, target]` without traversal. Candidates are explored in
/// ascending id order, so the result does not depend on input order.
pub fn detect_cycle(
    snapshot: &AdjacencySnapshot,
    target: TemplateId,
    candidates: &[TemplateId],
) -> Result<(), Vec<TemplateId>> {
    let candidates: BTreeSet<TemplateId> = candidates.iter().copied().collect();
    if candidates.contains(&target) {
        return Err(vec![target, target]);
    }

    let mut search = Search {
        snapshot,
        target,
        candidates: &candidates,
        colors: HashMap::new(),
        path: Vec::new(),
    };

    for &start in &candidates {
        if search.colors.contains_key(&start) {
            continue;
        }
        if let Some(cycle) = search.visit(start) {
            return Err(cycle);
        }
    }
    Ok(())
}

struct Search<'a> {
    snapshot: &'a AdjacencySnapshot,
    target: TemplateId,
    candidates: &'a BTreeSet<TemplateId>,
    colors: HashMap<TemplateId, Color>,
    path: Vec<TemplateId>,
}

impl Search<'_> {
    fn neighbors(&self, node: TemplateId) -> Vec<TemplateId> {
        if node == self.target {
            self.candidates.iter().copied().collect()
        } else {
            self.snapshot.dependencies(node).collect()
        }
    }

    fn visit(&mut self, node: TemplateId) -> Option<Vec<TemplateId>> {
        self.colors.insert(node, Color::Gray);
        self.path.push(node);

        for neighbor in self.neighbors(node) {
            if neighbor == self.target {
                // target -> path[0] -> ... -> node -> target
                let mut cycle = Vec::with_capacity(self.path.len() + 2);
                cycle.push(self.target);
                cycle.extend_from_slice(&self.path);
                cycle.push(self.target);
                return Some(cycle);
            }
            match self.colors.get(&neighbor) {
                Some(Color::Gray) => {
                    // A cycle that does not pass through the target; the snapshot
                    // itself is already cyclic
                    let start = self.path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = self.path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::Black) => {}
                None => {
                    if let Some(cycle) = self.visit(neighbor) {
                        return Some(cycle);
                    }
                }
            }
        }

        self.path.pop();
        self.colors.insert(node, Color::Black);
        None
    }
}
