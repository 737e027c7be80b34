//! Directed dependency graph over assembly identities.

use std::collections::{BTreeMap, BTreeSet};

use crate::identity::AssemblyId;

/// Adjacency map from an assembly to the set of assemblies it depends on.
///
/// Entries exist only for assemblies that contributed at least one edge;
/// an assembly nobody references and that references nothing never appears.
/// Backed by ordered containers so roots, neighbors and iteration all come
/// out in canonical (case-insensitive lexicographic) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<AssemblyId, BTreeSet<AssemblyId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dependency edge. Duplicate edges collapse; self-edges are
    /// refused. Returns whether the edge was newly inserted.
    pub fn add_edge(&mut self, from: AssemblyId, to: AssemblyId) -> bool {
        if from == to {
            return false;
        }
        self.edges.entry(from).or_default().insert(to)
    }

    /// Whether `id` has at least one outgoing edge.
    pub fn contains(&self, id: &AssemblyId) -> bool {
        self.edges.contains_key(id)
    }

    /// The dependencies of `id`, in canonical order. Empty when `id` has no
    /// outgoing edges.
    pub fn neighbors<'a>(&'a self, id: &AssemblyId) -> impl Iterator<Item = &'a AssemblyId> {
        self.edges.get(id).into_iter().flatten()
    }

    /// All assemblies with outgoing edges, in canonical order.
    pub fn sources(&self) -> impl Iterator<Item = &AssemblyId> {
        self.edges.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Sources that no other source lists as a dependency, in canonical
    /// order.
    ///
    /// A graph whose sources all reference each other (one big cycle) has no
    /// roots at all and yields an empty list.
    pub fn roots(&self) -> Vec<AssemblyId> {
        let mut referenced: BTreeSet<&AssemblyId> = BTreeSet::new();
        for targets in self.edges.values() {
            referenced.extend(targets.iter());
        }
        self.edges.keys().filter(|id| !referenced.contains(*id)).cloned().collect()
    }

    /// The graph with every edge flipped: (a -> b) becomes (b -> a). Only
    /// former edge targets become sources of the reversal.
    pub fn reversed(&self) -> DependencyGraph {
        let mut reversed = DependencyGraph::new();
        for (from, targets) in &self.edges {
            for to in targets {
                reversed.add_edge(to.clone(), from.clone());
            }
        }
        reversed
    }
}
