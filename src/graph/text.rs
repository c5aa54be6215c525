//! Text renderings of argument graphs for the semantic prefilter.
//!
//! The prefilter compares whole graphs at the text level, so the way a graph
//! is flattened into a string matters. The default rendering is the id-sorted
//! atom concatenation; traversal-based renderings order atoms by their
//! position in the argument structure instead.

use super::model::ArgumentGraph;
use super::node::{Node, NodeId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// How to flatten a graph into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphTextAlgorithm {
    /// Atom texts in id order
    #[default]
    NodeId,
    /// Atom texts in a seeded random order
    Random,
    /// Atom texts in breadth-first order from the root claim
    Bfs,
    /// Atom texts in depth-first order from the root claim
    Dfs,
}

/// Render a graph as text using the given algorithm.
pub fn render(graph: &ArgumentGraph, algorithm: GraphTextAlgorithm) -> String {
    match algorithm {
        GraphTextAlgorithm::NodeId => graph.text().to_string(),
        GraphTextAlgorithm::Random => random(graph),
        GraphTextAlgorithm::Bfs => traverse(graph, Strategy::Breadth),
        GraphTextAlgorithm::Dfs => traverse(graph, Strategy::Depth),
    }
}

fn random(graph: &ArgumentGraph) -> String {
    // Fixed seed: the rendering must be stable across calls so that the
    // prefilter stays idempotent.
    let mut rng = StdRng::seed_from_u64(0);
    let mut texts: Vec<&str> = graph.atom_nodes().map(|n| n.text.as_str()).collect();
    texts.shuffle(&mut rng);
    texts.join(" ")
}

enum Strategy {
    Breadth,
    Depth,
}

/// Traverse from the root claim over incoming edges, collecting atom texts.
///
/// The root is the node with no outgoing edges (the final claim in an
/// argument graph); ties break by id order. Graphs without such a node
/// (e.g. cyclic) fall back to the id-sorted rendering.
fn traverse(graph: &ArgumentGraph, strategy: Strategy) -> String {
    let Some(root) = root_node(graph) else {
        return graph.text().to_string();
    };

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut texts: Vec<String> = Vec::new();

    queue.push_back(root);

    while let Some(id) = match strategy {
        Strategy::Breadth => queue.pop_front(),
        Strategy::Depth => queue.pop_back(),
    } {
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(Node::Atom(atom)) = graph.node(&id) {
            texts.push(atom.text.clone());
        }
        for child in incoming_sources(graph, &id) {
            if !visited.contains(&child) {
                queue.push_back(child);
            }
        }
    }

    texts.join(" ")
}

/// The first node (by id) without outgoing edges.
fn root_node(graph: &ArgumentGraph) -> Option<NodeId> {
    let has_outgoing: HashSet<&NodeId> = graph.edges().map(|e| &e.source).collect();
    graph
        .atom_ids()
        .iter()
        .chain(graph.scheme_ids().iter())
        .filter(|id| !has_outgoing.contains(id))
        .min()
        .cloned()
}

/// Sources of edges pointing at `target`, id-sorted for determinism.
fn incoming_sources(graph: &ArgumentGraph, target: &NodeId) -> Vec<NodeId> {
    let mut sources: Vec<NodeId> = graph
        .edges()
        .filter(|e| &e.target == target)
        .map(|e| e.source.clone())
        .collect();
    sources.sort();
    sources.dedup();
    sources
}
