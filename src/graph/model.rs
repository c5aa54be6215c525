//! The argument graph: a typed directed multigraph, immutable after
//! construction.
//!
//! Graphs are built from a [`SerializedGraph`] at request entry. Construction
//! validates structural integrity (every edge endpoint must exist) and
//! precomputes the graph text used by the semantic prefilter.

use super::edge::{Edge, EdgeId};
use super::node::{AtomNode, Node, NodeId, Scheme, SchemeNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a graph
///
/// Serializes as a plain string (UUID or semantic ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(String);

impl GraphId {
    /// Create a new random GraphId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a GraphId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GraphId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GraphId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Errors raised while constructing a graph from its serialized form
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
}

/// The wire form of a node: the id lives in the enclosing map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    Atom {
        text: String,
    },
    Scheme {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scheme: Option<Scheme>,
    },
}

/// The wire form of an edge: the id lives in the enclosing map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEdge {
    pub source: NodeId,
    pub target: NodeId,
}

/// The wire form of an argument graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    /// Graph id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<GraphId>,
    #[serde(default)]
    pub name: String,
    pub nodes: BTreeMap<NodeId, SerializedNode>,
    #[serde(default)]
    pub edges: BTreeMap<EdgeId, SerializedEdge>,
}

/// A typed directed multigraph of atom and scheme nodes.
///
/// Immutable after construction. All collections support O(1) lookup by id
/// and O(N) enumeration. The atom/scheme id lists are kept id-sorted so that
/// enumeration order (and the derived graph text) is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentGraph {
    id: GraphId,
    name: String,
    nodes: HashMap<NodeId, Node>,
    atom_ids: Vec<NodeId>,
    scheme_ids: Vec<NodeId>,
    edges: HashMap<EdgeId, Edge>,
    edge_ids: Vec<EdgeId>,
    text: String,
}

impl ArgumentGraph {
    /// Build a graph from its serialized form, validating edge endpoints.
    pub fn from_serialized(serialized: &SerializedGraph) -> Result<Self, GraphError> {
        let mut nodes = HashMap::with_capacity(serialized.nodes.len());
        let mut atom_ids = Vec::new();
        let mut scheme_ids = Vec::new();

        // BTreeMap iteration is id-sorted already.
        for (id, node) in &serialized.nodes {
            match node {
                SerializedNode::Atom { text } => {
                    atom_ids.push(id.clone());
                    nodes.insert(
                        id.clone(),
                        Node::Atom(AtomNode {
                            id: id.clone(),
                            text: text.clone(),
                        }),
                    );
                }
                SerializedNode::Scheme { scheme } => {
                    scheme_ids.push(id.clone());
                    nodes.insert(
                        id.clone(),
                        Node::Scheme(SchemeNode {
                            id: id.clone(),
                            scheme: scheme.clone(),
                        }),
                    );
                }
            }
        }

        let mut edges = HashMap::with_capacity(serialized.edges.len());
        let mut edge_ids = Vec::new();

        for (id, edge) in &serialized.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !nodes.contains_key(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge: id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            edge_ids.push(id.clone());
            edges.insert(
                id.clone(),
                Edge {
                    id: id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                },
            );
        }

        let text = joined_atom_text(&nodes, &atom_ids);

        Ok(Self {
            id: serialized.id.clone().unwrap_or_default(),
            name: serialized.name.clone(),
            nodes,
            atom_ids,
            scheme_ids,
            edges,
            edge_ids,
            text,
        })
    }

    /// Convert back to the wire form. `from_serialized(to_serialized(g)) == g`.
    pub fn to_serialized(&self) -> SerializedGraph {
        let nodes = self
            .nodes
            .iter()
            .map(|(id, node)| {
                let serialized = match node {
                    Node::Atom(n) => SerializedNode::Atom {
                        text: n.text.clone(),
                    },
                    Node::Scheme(n) => SerializedNode::Scheme {
                        scheme: n.scheme.clone(),
                    },
                };
                (id.clone(), serialized)
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .map(|(id, edge)| {
                (
                    id.clone(),
                    SerializedEdge {
                        source: edge.source.clone(),
                        target: edge.target.clone(),
                    },
                )
            })
            .collect();

        SerializedGraph {
            id: Some(self.id.clone()),
            name: self.name.clone(),
            nodes,
            edges,
        }
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a node by id
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up an edge by id
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// All nodes, unordered
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, unordered
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Ids of all atom nodes, id-sorted
    pub fn atom_ids(&self) -> &[NodeId] {
        &self.atom_ids
    }

    /// Ids of all scheme nodes, id-sorted
    pub fn scheme_ids(&self) -> &[NodeId] {
        &self.scheme_ids
    }

    /// Ids of all edges, id-sorted
    pub fn edge_ids(&self) -> &[EdgeId] {
        &self.edge_ids
    }

    /// Atom nodes in id order
    pub fn atom_nodes(&self) -> impl Iterator<Item = &AtomNode> {
        self.atom_ids
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(Node::as_atom))
    }

    /// Scheme nodes in id order
    pub fn scheme_nodes(&self) -> impl Iterator<Item = &SchemeNode> {
        self.scheme_ids
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(Node::as_scheme))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The space-joined, id-sorted concatenation of atom texts.
    ///
    /// This is the default text rendering used by the semantic prefilter.
    pub fn text(&self) -> &str {
        &self.text
    }
}

fn joined_atom_text(nodes: &HashMap<NodeId, Node>, atom_ids: &[NodeId]) -> String {
    atom_ids
        .iter()
        .filter_map(|id| nodes.get(id).and_then(Node::as_atom))
        .map(|n| n.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
