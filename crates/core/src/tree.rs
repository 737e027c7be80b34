//! Per-root dependency trees.

use std::collections::BTreeSet;
use std::vec;

use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;
use crate::identity::AssemblyId;

/// One node of a rendered dependency tree: a display label plus ordered
/// children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self { label: label.into(), children: Vec::new() }
    }
}

/// A node mid-construction: its label, the children it claimed but has not
/// expanded yet, and the subtrees already built under it.
struct Frame {
    label: String,
    pending: vec::IntoIter<AssemblyId>,
    built: Vec<TreeNode>,
}

/// Open a frame for `id`, claiming every not-yet-visited neighbor.
///
/// All admissible children are marked visited here, before any of them is
/// descended into, so a node reachable through two of its siblings still
/// lands under the earliest sibling in iteration order.
fn open_frame(graph: &DependencyGraph, id: &AssemblyId, visited: &mut BTreeSet<AssemblyId>) -> Frame {
    let mut claimed = Vec::new();
    for child in graph.neighbors(id) {
        if visited.insert(child.clone()) {
            claimed.push(child.clone());
        }
    }
    Frame {
        label: id.display_label().to_string(),
        pending: claimed.into_iter(),
        built: Vec::new(),
    }
}

/// Build the dependency tree rooted at `id`.
///
/// One visited set is shared across the whole construction, so each identity
/// appears at most once in the tree; whichever parent claims it first in
/// iteration order keeps it. The start node itself is not pre-claimed, which
/// means building from inside a cycle repeats the start node once as a
/// descendant. Construction uses an explicit frame stack, so tree depth is
/// bounded by graph size rather than the call stack.
pub fn build_tree(graph: &DependencyGraph, id: &AssemblyId) -> TreeNode {
    let mut visited: BTreeSet<AssemblyId> = BTreeSet::new();
    let mut stack = vec![open_frame(graph, id, &mut visited)];
    let mut result = None;

    while let Some(top) = stack.last_mut() {
        match top.pending.next() {
            Some(child) => {
                let frame = open_frame(graph, &child, &mut visited);
                stack.push(frame);
            }
            None => {
                if let Some(done) = stack.pop() {
                    let node = TreeNode { label: done.label, children: done.built };
                    match stack.last_mut() {
                        Some(parent) => parent.built.push(node),
                        None => result = Some(node),
                    }
                }
            }
        }
    }

    result.unwrap_or_else(|| TreeNode::leaf(id.display_label()))
}

/// Build one tree per root of `graph`, in canonical root order.
pub fn build_forest(graph: &DependencyGraph) -> Vec<TreeNode> {
    graph.roots().iter().map(|root| build_tree(graph, root)).collect()
}
