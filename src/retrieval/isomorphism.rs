//! Subgraph-monomorphism fallback for structural retrieval.
//!
//! Both graphs are abstracted to node labels (atoms collapse to one label,
//! schemes keep as much of their kind/taxonomy value as the scheme-handling
//! policy distinguishes). Every embedding of the query into the case that
//! preserves labels and edge directions is enumerated by backtracking; the
//! embedding with the highest mean atom similarity wins. Retained for
//! benchmarking against the A* search, not as the primary algorithm.

use super::cancel::CancellationToken;
use super::mapping::{Element, Mapping};
use super::simtable::SimTable;
use super::RetrievalError;
use crate::graph::{ArgumentGraph, Node, NodeId, Scheme};
use crate::nlp::{SchemeHandling, SimilarityKernel};
use std::collections::{HashMap, HashSet};

/// Upper bound on enumerated embeddings per case. Argument graphs are small;
/// hitting this means the label abstraction was too coarse to prune.
const MAX_MONOMORPHISMS: usize = 10_000;

/// Find the best label-preserving embedding of `query` into `case`.
///
/// Returns the mean atom similarity of the best embedding and the
/// corresponding mapping; no embedding yields score 0 and an empty mapping.
pub(crate) fn search_case(
    kernel: &mut SimilarityKernel,
    query: &ArgumentGraph,
    case: &ArgumentGraph,
    scheme_handling: SchemeHandling,
    cancel: &CancellationToken,
) -> Result<(f64, Mapping), RetrievalError> {
    let table = SimTable::build(kernel, query, case)?;

    let query_labels = labels(query, scheme_handling);
    let case_labels = labels(case, scheme_handling);

    // Query nodes in id order; candidate case nodes per label, id-sorted.
    let mut query_ids: Vec<NodeId> = query_labels.keys().cloned().collect();
    query_ids.sort();

    let mut candidates: HashMap<&str, Vec<NodeId>> = HashMap::new();
    for (id, label) in &case_labels {
        candidates.entry(label.as_str()).or_default().push(id.clone());
    }
    for ids in candidates.values_mut() {
        ids.sort();
    }

    let case_adjacency: HashSet<(NodeId, NodeId)> = case
        .edges()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect();

    let mut enumerator = Enumerator {
        query,
        query_ids: &query_ids,
        query_labels: &query_labels,
        candidates: &candidates,
        case_adjacency: &case_adjacency,
        cancel,
        assignment: HashMap::new(),
        used: HashSet::new(),
        found: Vec::new(),
    };
    enumerator.descend(0)?;

    if enumerator.found.len() >= MAX_MONOMORPHISMS {
        tracing::debug!(
            query = %query.id(),
            case = %case.id(),
            "monomorphism enumeration capped at {}",
            MAX_MONOMORPHISMS
        );
    }

    let Some(best) = enumerator
        .found
        .iter()
        .map(|assignment| (atom_score(query, assignment, &table), assignment))
        .max_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return Ok((0.0, Mapping::new(query.node_count(), query.edge_count())));
    };

    let (score, assignment) = best;
    let mapping = build_mapping(query, case, assignment, &table)?;
    Ok((score, mapping))
}

fn labels(graph: &ArgumentGraph, handling: SchemeHandling) -> HashMap<NodeId, String> {
    graph
        .nodes()
        .map(|node| {
            let label = match node {
                Node::Atom(_) => "atom".to_string(),
                Node::Scheme(scheme_node) => scheme_label(&scheme_node.scheme, handling),
            };
            (node.id().clone(), label)
        })
        .collect()
}

fn scheme_label(scheme: &Option<Scheme>, handling: SchemeHandling) -> String {
    match (handling, scheme) {
        (SchemeHandling::Unspecified, _) | (_, None) => "scheme".to_string(),
        (SchemeHandling::Binary, Some(s)) => format!("scheme:{}", s.kind),
        (SchemeHandling::Taxonomy | SchemeHandling::Exact, Some(s)) => match &s.taxonomy {
            Some(value) => format!("scheme:{}:{}", s.kind, value),
            None => format!("scheme:{}", s.kind),
        },
    }
}

struct Enumerator<'a> {
    query: &'a ArgumentGraph,
    query_ids: &'a [NodeId],
    query_labels: &'a HashMap<NodeId, String>,
    candidates: &'a HashMap<&'a str, Vec<NodeId>>,
    case_adjacency: &'a HashSet<(NodeId, NodeId)>,
    cancel: &'a CancellationToken,
    assignment: HashMap<NodeId, NodeId>,
    used: HashSet<NodeId>,
    found: Vec<HashMap<NodeId, NodeId>>,
}

impl Enumerator<'_> {
    fn descend(&mut self, depth: usize) -> Result<(), RetrievalError> {
        if self.found.len() >= MAX_MONOMORPHISMS {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }
        if depth == self.query_ids.len() {
            self.found.push(self.assignment.clone());
            return Ok(());
        }

        let query_id = self.query_ids[depth].clone();
        let label = self.query_labels[&query_id].clone();
        let candidates = match self.candidates.get(label.as_str()) {
            Some(ids) => ids.clone(),
            None => return Ok(()),
        };

        for candidate in candidates {
            if self.used.contains(&candidate) {
                continue;
            }
            if !self.edges_consistent(&query_id, &candidate) {
                continue;
            }
            self.assignment.insert(query_id.clone(), candidate.clone());
            self.used.insert(candidate.clone());
            self.descend(depth + 1)?;
            self.assignment.remove(&query_id);
            self.used.remove(&candidate);
        }

        Ok(())
    }

    /// Every query edge between `query_id` and an already-assigned node must
    /// have a same-direction counterpart between the images.
    fn edges_consistent(&self, query_id: &NodeId, candidate: &NodeId) -> bool {
        self.query.edges().all(|edge| {
            if &edge.source == query_id {
                match self.assignment.get(&edge.target) {
                    Some(target_image) => self
                        .case_adjacency
                        .contains(&(candidate.clone(), target_image.clone())),
                    None => true,
                }
            } else if &edge.target == query_id {
                match self.assignment.get(&edge.source) {
                    Some(source_image) => self
                        .case_adjacency
                        .contains(&(source_image.clone(), candidate.clone())),
                    None => true,
                }
            } else {
                true
            }
        })
    }
}

/// Mean atom similarity of an embedding; 0 when the query has no atoms.
fn atom_score(
    query: &ArgumentGraph,
    assignment: &HashMap<NodeId, NodeId>,
    table: &SimTable,
) -> f64 {
    if query.atom_ids().is_empty() {
        return 0.0;
    }
    let sum: f64 = query
        .atom_ids()
        .iter()
        .filter_map(|id| assignment.get(id).map(|image| table.node_sim(id, image)))
        .sum();
    sum / query.atom_ids().len() as f64
}

/// Materialise the embedding as a mapping, including one case edge per query
/// edge (the lowest-id unused edge between the images).
fn build_mapping(
    query: &ArgumentGraph,
    case: &ArgumentGraph,
    assignment: &HashMap<NodeId, NodeId>,
    table: &SimTable,
) -> Result<Mapping, RetrievalError> {
    let mut mapping = Mapping::new(query.node_count(), query.edge_count());

    let mut node_ids: Vec<&NodeId> = assignment.keys().collect();
    node_ids.sort();
    for query_id in node_ids {
        let case_id = &assignment[query_id];
        mapping
            .extend(
                query,
                case,
                &Element::Node(query_id.clone()),
                &Element::Node(case_id.clone()),
                table.node_sim(query_id, case_id),
            )
            .map_err(|e| RetrievalError::Internal(e.to_string()))?;
    }

    let mut used_case_edges: HashSet<&crate::graph::EdgeId> = HashSet::new();
    for query_edge_id in query.edge_ids() {
        let Some(query_edge) = query.edge(query_edge_id) else {
            continue;
        };
        let (Some(source_image), Some(target_image)) = (
            assignment.get(&query_edge.source),
            assignment.get(&query_edge.target),
        ) else {
            continue;
        };
        let image = case
            .edge_ids()
            .iter()
            .filter(|id| !used_case_edges.contains(id))
            .find(|id| {
                case.edge(id).is_some_and(|e| {
                    &e.source == source_image && &e.target == target_image
                })
            });
        if let Some(case_edge_id) = image {
            used_case_edges.insert(case_edge_id);
            mapping
                .extend(
                    query,
                    case,
                    &Element::Edge(query_edge_id.clone()),
                    &Element::Edge(case_edge_id.clone()),
                    table.edge_sim(query_edge_id, case_edge_id),
                )
                .map_err(|e| RetrievalError::Internal(e.to_string()))?;
        }
    }

    Ok(mapping)
}
