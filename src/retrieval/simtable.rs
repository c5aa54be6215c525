//! Precomputed pairwise similarities for one (query, case) pair.
//!
//! The structural search needs sim(x, y) for every query element and every
//! compatible case element, both for scoring extensions and for its
//! admissible heuristic. All pairs are computed up front through a single
//! batched kernel call, so the search loop itself never touches the
//! embedding provider.

use crate::graph::{ArgumentGraph, EdgeId, NodeId};
use crate::nlp::{GraphElement, ProviderError, SimilarityKernel};
use crate::retrieval::mapping::Element;
use std::collections::HashMap;

/// Pairwise node/edge similarities plus per-query-element maxima.
#[derive(Debug)]
pub(crate) struct SimTable {
    node: HashMap<(NodeId, NodeId), f64>,
    edge: HashMap<(EdgeId, EdgeId), f64>,
    best_node: HashMap<NodeId, f64>,
    best_edge: HashMap<EdgeId, f64>,
}

impl SimTable {
    pub(crate) fn build(
        kernel: &mut SimilarityKernel,
        query: &ArgumentGraph,
        case: &ArgumentGraph,
    ) -> Result<Self, ProviderError> {
        // Same-variant node pairs; cross-variant pairs score 0 and are left
        // out of the table.
        let mut keys: Vec<(NodeId, NodeId)> = Vec::new();
        let mut pairs: Vec<(GraphElement<'_>, GraphElement<'_>)> = Vec::new();

        for (query_ids, case_ids) in [
            (query.atom_ids(), case.atom_ids()),
            (query.scheme_ids(), case.scheme_ids()),
        ] {
            for qid in query_ids {
                for cid in case_ids {
                    let (Some(qn), Some(cn)) = (query.node(qid), case.node(cid)) else {
                        continue;
                    };
                    keys.push((qid.clone(), cid.clone()));
                    pairs.push((GraphElement::Node(qn), GraphElement::Node(cn)));
                }
            }
        }

        let sims = kernel.sims(&pairs)?;
        let node: HashMap<(NodeId, NodeId), f64> = keys.into_iter().zip(sims).collect();

        // Edge similarity is the mean of the endpoint-pair similarities;
        // cross-variant endpoints contribute 0.
        let mut edge = HashMap::new();
        for qid in query.edge_ids() {
            for cid in case.edge_ids() {
                let (Some(qe), Some(ce)) = (query.edge(qid), case.edge(cid)) else {
                    continue;
                };
                let source = node
                    .get(&(qe.source.clone(), ce.source.clone()))
                    .copied()
                    .unwrap_or(0.0);
                let target = node
                    .get(&(qe.target.clone(), ce.target.clone()))
                    .copied()
                    .unwrap_or(0.0);
                edge.insert((qid.clone(), cid.clone()), 0.5 * (source + target));
            }
        }

        let mut best_node: HashMap<NodeId, f64> = HashMap::new();
        for ((qid, _), sim) in &node {
            let entry = best_node.entry(qid.clone()).or_insert(0.0);
            *entry = entry.max(*sim);
        }
        let mut best_edge: HashMap<EdgeId, f64> = HashMap::new();
        for ((qid, _), sim) in &edge {
            let entry = best_edge.entry(qid.clone()).or_insert(0.0);
            *entry = entry.max(*sim);
        }

        Ok(Self {
            node,
            edge,
            best_node,
            best_edge,
        })
    }

    /// sim(query node, case node); 0 for cross-variant pairs
    pub(crate) fn node_sim(&self, q: &NodeId, c: &NodeId) -> f64 {
        self.node.get(&(q.clone(), c.clone())).copied().unwrap_or(0.0)
    }

    /// sim(query edge, case edge)
    pub(crate) fn edge_sim(&self, q: &EdgeId, c: &EdgeId) -> f64 {
        self.edge.get(&(q.clone(), c.clone())).copied().unwrap_or(0.0)
    }

    /// Similarity for an element pair of the same kind
    pub(crate) fn sim(&self, q: &Element, c: &Element) -> f64 {
        match (q, c) {
            (Element::Node(qid), Element::Node(cid)) => self.node_sim(qid, cid),
            (Element::Edge(qid), Element::Edge(cid)) => self.edge_sim(qid, cid),
            _ => 0.0,
        }
    }

    /// The best similarity any case candidate offers for a query element.
    /// Ignores legality and injectivity, so it upper-bounds what a legal
    /// extension can score.
    pub(crate) fn best(&self, element: &Element) -> f64 {
        match element {
            Element::Node(id) => self.best_node.get(id).copied().unwrap_or(0.0),
            Element::Edge(id) => self.best_edge.get(id).copied().unwrap_or(0.0),
        }
    }
}
