//! Partial legal mappings between query and case elements.
//!
//! A mapping pairs query nodes/edges with case nodes/edges. It is injective
//! on the case side, type-consistent, and structurally consistent for edges
//! (the endpoint pairs must themselves be legal node pairs). The per-pair
//! similarity is stored at extension time, so the mapping's aggregate
//! similarity never depends on cache state.

use crate::graph::{ArgumentGraph, EdgeId, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Violated mapping invariant. Reaching this is a bug in the caller, not a
/// property of the inputs.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("illegal mapping extension: {0}")]
    Illegal(String),
}

/// A handle to a query or case element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Node(NodeId),
    Edge(EdgeId),
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Node(id) => write!(f, "node {}", id),
            Element::Edge(id) => write!(f, "edge {}", id),
        }
    }
}

/// A mapped node pair with its similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMapping {
    pub query_id: NodeId,
    pub case_id: NodeId,
    pub similarity: f64,
}

/// A mapped edge pair with its similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMapping {
    pub query_id: EdgeId,
    pub case_id: EdgeId,
    pub similarity: f64,
}

/// A partial legal mapping with incrementally maintained similarity.
///
/// The denominator of the similarity is fixed at construction to the query's
/// element totals, so incomplete mappings are penalised.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    available_nodes: usize,
    available_edges: usize,
    node_mappings: BTreeMap<NodeId, NodeMapping>,
    edge_mappings: BTreeMap<EdgeId, EdgeMapping>,
    /// case node -> query node, for injectivity and endpoint checks
    mapped_case_nodes: HashMap<NodeId, NodeId>,
    mapped_case_edges: HashSet<EdgeId>,
    similarity_sum: f64,
}

impl Mapping {
    /// Create an empty mapping for a query with the given element totals.
    pub fn new(available_nodes: usize, available_edges: usize) -> Self {
        Self {
            available_nodes,
            available_edges,
            node_mappings: BTreeMap::new(),
            edge_mappings: BTreeMap::new(),
            mapped_case_nodes: HashMap::new(),
            mapped_case_edges: HashSet::new(),
            similarity_sum: 0.0,
        }
    }

    /// Node mappings in query-id order
    pub fn node_mappings(&self) -> impl Iterator<Item = &NodeMapping> {
        self.node_mappings.values()
    }

    /// Edge mappings in query-id order
    pub fn edge_mappings(&self) -> impl Iterator<Item = &EdgeMapping> {
        self.edge_mappings.values()
    }

    /// Total number of mapped pairs
    pub fn len(&self) -> usize {
        self.node_mappings.len() + self.edge_mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_mappings.is_empty() && self.edge_mappings.is_empty()
    }

    /// Aggregate similarity: mapped pair similarities over the query's fixed
    /// element totals. An empty mapping (or an empty query) scores 0.
    pub fn similarity(&self) -> f64 {
        let denominator = self.available_nodes + self.available_edges;
        if denominator == 0 {
            0.0
        } else {
            self.similarity_sum / denominator as f64
        }
    }

    /// Check whether mapping query element `q` to case element `c` is legal
    /// under the current partial mapping.
    pub fn is_legal(
        &self,
        query: &ArgumentGraph,
        case: &ArgumentGraph,
        q: &Element,
        c: &Element,
    ) -> bool {
        match (q, c) {
            (Element::Node(nq), Element::Node(nc)) => self.is_legal_node_pair(query, case, nq, nc),
            (Element::Edge(eq), Element::Edge(ec)) => self.is_legal_edge_pair(query, case, eq, ec),
            _ => false,
        }
    }

    /// A node pair is legal when both nodes are the same variant and the pair
    /// is compatible with the current mapping: either already mapped to each
    /// other, or both sides are still free.
    pub fn is_legal_node_pair(
        &self,
        query: &ArgumentGraph,
        case: &ArgumentGraph,
        nq: &NodeId,
        nc: &NodeId,
    ) -> bool {
        let (Some(query_node), Some(case_node)) = (query.node(nq), case.node(nc)) else {
            return false;
        };
        if !query_node.same_variant(case_node) {
            return false;
        }
        match (self.node_mappings.get(nq), self.mapped_case_nodes.get(nc)) {
            // Query node already mapped: only the existing partner is legal.
            (Some(existing), _) => existing.case_id == *nc,
            // Case node taken by a different query node.
            (None, Some(_)) => false,
            (None, None) => true,
        }
    }

    /// An edge pair is legal when the case edge is free and both endpoint
    /// pairs are legal node pairs (already mapped to each other, or still
    /// free and type-compatible).
    pub fn is_legal_edge_pair(
        &self,
        query: &ArgumentGraph,
        case: &ArgumentGraph,
        eq: &EdgeId,
        ec: &EdgeId,
    ) -> bool {
        if self.mapped_case_edges.contains(ec) {
            return false;
        }
        let (Some(query_edge), Some(case_edge)) = (query.edge(eq), case.edge(ec)) else {
            return false;
        };
        self.is_legal_node_pair(query, case, &query_edge.source, &case_edge.source)
            && self.is_legal_node_pair(query, case, &query_edge.target, &case_edge.target)
    }

    /// Add the pair `(q, c)` with its precomputed similarity.
    ///
    /// Precondition: `is_legal(q, c)` and `q` not yet mapped. Violations
    /// return an error rather than corrupting the mapping.
    pub fn extend(
        &mut self,
        query: &ArgumentGraph,
        case: &ArgumentGraph,
        q: &Element,
        c: &Element,
        similarity: f64,
    ) -> Result<(), MappingError> {
        match (q, c) {
            (Element::Node(nq), Element::Node(nc)) => {
                if self.node_mappings.contains_key(nq) {
                    return Err(MappingError::Illegal(format!(
                        "query {} is already mapped",
                        q
                    )));
                }
                if !self.is_legal_node_pair(query, case, nq, nc) {
                    return Err(MappingError::Illegal(format!("{} -> {}", q, c)));
                }
                self.mapped_case_nodes.insert(nc.clone(), nq.clone());
                self.node_mappings.insert(
                    nq.clone(),
                    NodeMapping {
                        query_id: nq.clone(),
                        case_id: nc.clone(),
                        similarity,
                    },
                );
            }
            (Element::Edge(eq), Element::Edge(ec)) => {
                if self.edge_mappings.contains_key(eq) {
                    return Err(MappingError::Illegal(format!(
                        "query {} is already mapped",
                        q
                    )));
                }
                if !self.is_legal_edge_pair(query, case, eq, ec) {
                    return Err(MappingError::Illegal(format!("{} -> {}", q, c)));
                }
                self.mapped_case_edges.insert(ec.clone());
                self.edge_mappings.insert(
                    eq.clone(),
                    EdgeMapping {
                        query_id: eq.clone(),
                        case_id: ec.clone(),
                        similarity,
                    },
                );
            }
            _ => {
                return Err(MappingError::Illegal(format!(
                    "variant mismatch: {} -> {}",
                    q, c
                )))
            }
        }
        self.similarity_sum += similarity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SerializedGraph;

    fn graph(json: serde_json::Value) -> ArgumentGraph {
        let serialized: SerializedGraph = serde_json::from_value(json).unwrap();
        ArgumentGraph::from_serialized(&serialized).unwrap()
    }

    fn fixture() -> (ArgumentGraph, ArgumentGraph) {
        let query = graph(serde_json::json!({
            "id": "q",
            "nodes": {
                "qa1": {"type": "atom", "text": "one"},
                "qa2": {"type": "atom", "text": "two"},
                "qs1": {"type": "scheme", "scheme": {"kind": "support"}}
            },
            "edges": {
                "qe1": {"source": "qa1", "target": "qs1"},
                "qe2": {"source": "qs1", "target": "qa2"}
            }
        }));
        let case = graph(serde_json::json!({
            "id": "c",
            "nodes": {
                "ca1": {"type": "atom", "text": "one"},
                "ca2": {"type": "atom", "text": "two"},
                "cs1": {"type": "scheme", "scheme": {"kind": "support"}}
            },
            "edges": {
                "ce1": {"source": "ca1", "target": "cs1"},
                "ce2": {"source": "cs1", "target": "ca2"}
            }
        }));
        (query, case)
    }

    #[test]
    fn variant_mismatch_is_illegal() {
        let (query, case) = fixture();
        let mapping = Mapping::new(3, 2);
        assert!(!mapping.is_legal_node_pair(&query, &case, &"qa1".into(), &"cs1".into()));
        assert!(mapping.is_legal_node_pair(&query, &case, &"qa1".into(), &"ca1".into()));
        assert!(mapping.is_legal_node_pair(&query, &case, &"qs1".into(), &"cs1".into()));
    }

    #[test]
    fn case_side_is_injective() {
        let (query, case) = fixture();
        let mut mapping = Mapping::new(3, 2);
        mapping
            .extend(
                &query,
                &case,
                &Element::Node("qa1".into()),
                &Element::Node("ca1".into()),
                1.0,
            )
            .unwrap();
        // ca1 is taken, qa2 cannot claim it.
        assert!(!mapping.is_legal_node_pair(&query, &case, &"qa2".into(), &"ca1".into()));
        let err = mapping.extend(
            &query,
            &case,
            &Element::Node("qa2".into()),
            &Element::Node("ca1".into()),
            1.0,
        );
        assert!(err.is_err());
    }

    #[test]
    fn double_mapping_a_query_element_is_rejected() {
        let (query, case) = fixture();
        let mut mapping = Mapping::new(3, 2);
        mapping
            .extend(
                &query,
                &case,
                &Element::Node("qa1".into()),
                &Element::Node("ca1".into()),
                1.0,
            )
            .unwrap();
        let err = mapping.extend(
            &query,
            &case,
            &Element::Node("qa1".into()),
            &Element::Node("ca2".into()),
            1.0,
        );
        assert!(err.is_err());
    }

    #[test]
    fn edge_legality_requires_compatible_endpoints() {
        let (query, case) = fixture();
        let mut mapping = Mapping::new(3, 2);
        // With no node mappings, endpoints are free and compatible.
        assert!(mapping.is_legal_edge_pair(&query, &case, &"qe1".into(), &"ce1".into()));

        // Map qa1 to ca2: qe1's source is now pinned elsewhere, so ce1 (whose
        // source is ca1) has an incompatible source pair.
        mapping
            .extend(
                &query,
                &case,
                &Element::Node("qa1".into()),
                &Element::Node("ca2".into()),
                0.5,
            )
            .unwrap();
        assert!(!mapping.is_legal_edge_pair(&query, &case, &"qe1".into(), &"ce1".into()));
    }

    #[test]
    fn edge_case_side_is_injective() {
        let (query, case) = fixture();
        let mut mapping = Mapping::new(3, 2);
        mapping
            .extend(
                &query,
                &case,
                &Element::Edge("qe1".into()),
                &Element::Edge("ce1".into()),
                1.0,
            )
            .unwrap();
        assert!(!mapping.is_legal_edge_pair(&query, &case, &"qe2".into(), &"ce1".into()));
    }

    #[test]
    fn similarity_divides_by_fixed_totals() {
        let (query, case) = fixture();
        let mut mapping = Mapping::new(3, 2);
        assert_eq!(mapping.similarity(), 0.0);
        mapping
            .extend(
                &query,
                &case,
                &Element::Node("qa1".into()),
                &Element::Node("ca1".into()),
                1.0,
            )
            .unwrap();
        assert!((mapping.similarity() - 1.0 / 5.0).abs() < 1e-9);
        mapping
            .extend(
                &query,
                &case,
                &Element::Node("qa2".into()),
                &Element::Node("ca2".into()),
                0.5,
            )
            .unwrap();
        assert!((mapping.similarity() - 1.5 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn empty_query_scores_zero() {
        let mapping = Mapping::new(0, 0);
        assert_eq!(mapping.similarity(), 0.0);
    }
}
