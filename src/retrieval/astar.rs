//! Bounded-beam A* search for the best legal mapping between a query and a
//! case graph (after Bergmann and Gil, 2014).
//!
//! States are partial mappings plus the query elements still to place,
//! ordered by `f = g + h` where `g` is the similarity already secured and `h`
//! optimistically matches every remaining element to its best case partner.
//! The frontier keeps at most `queue_limit` states after each expansion.
//!
//! The search cannot fail: every iteration either extends the best state's
//! mapping or discards one unmappable query element, so it terminates with
//! the best (possibly empty) mapping found.

use super::cancel::CancellationToken;
use super::mapping::{Element, Mapping};
use super::simtable::SimTable;
use super::RetrievalError;
use crate::graph::{ArgumentGraph, Node, NodeId};
use crate::nlp::SimilarityKernel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The future-cost estimate used to order the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// Best-partner bound: each remaining element counts its best case
    /// candidate, ignoring legality. Admissible and informative; the default.
    #[default]
    BestPair,
    /// Count bound: each remaining element counts 1.0. Admissible but
    /// uninformative; retained as a baseline only.
    Remaining,
}

/// Tunables for one search invocation.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    /// Maximum frontier size kept after each expansion; 0 = unbounded
    pub queue_limit: usize,
    /// Seed for the random element-selection order
    pub seed: u64,
    pub heuristic: Heuristic,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            queue_limit: 10_000,
            seed: 0,
            heuristic: Heuristic::default(),
        }
    }
}

/// One frontier state: the query elements not yet placed, the mapping so
/// far, and the estimate `f`.
#[derive(Debug, Clone)]
struct SearchNode {
    remaining_nodes: Vec<NodeId>,
    remaining_edges: Vec<crate::graph::EdgeId>,
    mapping: Mapping,
    /// Sum of per-element bounds over the remaining elements
    h_sum: f64,
    f: f64,
}

impl SearchNode {
    fn is_goal(&self) -> bool {
        self.remaining_nodes.is_empty() && self.remaining_edges.is_empty()
    }
}

/// Precompute the similarity table and run the search for one case.
pub(crate) fn search_case(
    kernel: &mut SimilarityKernel,
    query: &ArgumentGraph,
    case: &ArgumentGraph,
    params: SearchParams,
    cancel: &CancellationToken,
) -> Result<Mapping, RetrievalError> {
    let table = SimTable::build(kernel, query, case)?;
    a_star_search(query, case, &table, params, cancel)
}

/// Run the search against a prebuilt similarity table.
pub(crate) fn a_star_search(
    query: &ArgumentGraph,
    case: &ArgumentGraph,
    table: &SimTable,
    params: SearchParams,
    cancel: &CancellationToken,
) -> Result<Mapping, RetrievalError> {
    let total = query.node_count() + query.edge_count();
    if total == 0 {
        return Ok(Mapping::new(0, 0));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let bound = |element: &Element| match params.heuristic {
        Heuristic::BestPair => table.best(element),
        Heuristic::Remaining => 1.0,
    };

    let mut remaining_nodes: Vec<NodeId> = query
        .atom_ids()
        .iter()
        .chain(query.scheme_ids().iter())
        .cloned()
        .collect();
    remaining_nodes.sort();
    let remaining_edges = query.edge_ids().to_vec();

    let h_sum = remaining_nodes
        .iter()
        .map(|id| bound(&Element::Node(id.clone())))
        .chain(
            remaining_edges
                .iter()
                .map(|id| bound(&Element::Edge(id.clone()))),
        )
        .sum();

    let start = SearchNode {
        remaining_nodes,
        remaining_edges,
        mapping: Mapping::new(query.node_count(), query.edge_count()),
        h_sum,
        // Optimistic upper bound for the start state
        f: 1.0,
    };

    let mut frontier = vec![start];

    // Tail is the best state; loop until it is a goal.
    loop {
        match frontier.last() {
            Some(tail) if tail.is_goal() => break,
            Some(_) => {}
            // Unreachable: expansion always re-inserts or replaces states.
            None => return Ok(Mapping::new(query.node_count(), query.edge_count())),
        }
        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }
        expand(&mut frontier, query, case, table, total, &mut rng, &bound)?;
        if params.queue_limit > 0 && frontier.len() > params.queue_limit {
            let excess = frontier.len() - params.queue_limit;
            frontier.drain(0..excess);
        }
    }

    match frontier.pop() {
        Some(goal) => Ok(goal.mapping),
        None => Ok(Mapping::new(query.node_count(), query.edge_count())),
    }
}

/// Expand the best state: pick one remaining query element (nodes before
/// edges, uniformly at random within the group) and try every compatible
/// case candidate. If any legal successor exists the state is replaced by
/// its successors; otherwise the element is discarded in place.
fn expand(
    frontier: &mut Vec<SearchNode>,
    query: &ArgumentGraph,
    case: &ArgumentGraph,
    table: &SimTable,
    total: usize,
    rng: &mut StdRng,
    bound: &impl Fn(&Element) -> f64,
) -> Result<(), RetrievalError> {
    let Some(mut state) = frontier.pop() else {
        return Ok(());
    };

    let (index, query_element, candidates): (usize, Element, Vec<Element>) =
        if !state.remaining_nodes.is_empty() {
            let index = rng.gen_range(0..state.remaining_nodes.len());
            let id = state.remaining_nodes[index].clone();
            let candidates = match query.node(&id) {
                Some(Node::Atom(_)) => case.atom_ids(),
                _ => case.scheme_ids(),
            };
            (
                index,
                Element::Node(id),
                candidates.iter().cloned().map(Element::Node).collect(),
            )
        } else {
            let index = rng.gen_range(0..state.remaining_edges.len());
            let id = state.remaining_edges[index].clone();
            (
                index,
                Element::Edge(id),
                case.edge_ids().iter().cloned().map(Element::Edge).collect(),
            )
        };

    let mut produced = false;

    for candidate in candidates {
        if !state.mapping.is_legal(query, case, &query_element, &candidate) {
            continue;
        }
        let mut mapping = state.mapping.clone();
        mapping
            .extend(
                query,
                case,
                &query_element,
                &candidate,
                table.sim(&query_element, &candidate),
            )
            .map_err(|e| RetrievalError::Internal(e.to_string()))?;

        let mut successor = SearchNode {
            remaining_nodes: state.remaining_nodes.clone(),
            remaining_edges: state.remaining_edges.clone(),
            h_sum: state.h_sum - bound(&query_element),
            f: 0.0,
            mapping,
        };
        match &query_element {
            Element::Node(_) => {
                successor.remaining_nodes.swap_remove(index);
            }
            Element::Edge(_) => {
                successor.remaining_edges.swap_remove(index);
            }
        }
        successor.f = successor.mapping.similarity() + successor.h_sum / total as f64;
        insort(frontier, successor);
        produced = true;
    }

    if !produced {
        // No candidate fits: advance without a match. The stale `f` stays an
        // upper bound, so ordering remains admissible.
        match &query_element {
            Element::Node(_) => {
                state.remaining_nodes.swap_remove(index);
            }
            Element::Edge(_) => {
                state.remaining_edges.swap_remove(index);
            }
        }
        state.h_sum -= bound(&query_element);
        insort(frontier, state);
    }

    Ok(())
}

/// Insert into the ascending-by-`f` frontier, after any equal keys.
fn insort(frontier: &mut Vec<SearchNode>, node: SearchNode) {
    let position = frontier.partition_point(|existing| existing.f <= node.f);
    frontier.insert(position, node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SerializedGraph;
    use crate::nlp::{
        EmbeddingLevel, EmbeddingProvider, NlpConfig, ProviderError, SchemeHandling, TextVectors,
    };
    use crate::taxonomy::Taxonomy;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct StaticProvider {
        vectors: HashMap<String, Vec<f32>>,
    }

    impl StaticProvider {
        fn identity() -> Self {
            Self {
                vectors: HashMap::new(),
            }
        }

        fn with(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            }
        }
    }

    impl EmbeddingProvider for StaticProvider {
        fn vectors(
            &self,
            texts: &[&str],
            _level: EmbeddingLevel,
            _config: &NlpConfig,
        ) -> Result<Vec<TextVectors>, ProviderError> {
            // Unknown texts hash to a vector unique to the text, so equal
            // texts are similar and distinct texts are dissimilar.
            Ok(texts
                .iter()
                .map(|t| {
                    TextVectors::Document(self.vectors.get(*t).cloned().unwrap_or_else(|| {
                        let code = t.bytes().map(u64::from).sum::<u64>() % 7;
                        let mut v = vec![0.0; 8];
                        v[code as usize] = 1.0;
                        v
                    }))
                })
                .collect())
        }
    }

    fn kernel(provider: StaticProvider) -> SimilarityKernel {
        SimilarityKernel::new(
            Arc::new(provider),
            Arc::new(Taxonomy::empty()),
            NlpConfig::default(),
            SchemeHandling::Binary,
        )
    }

    fn graph(json: serde_json::Value) -> ArgumentGraph {
        let serialized: SerializedGraph = serde_json::from_value(json).unwrap();
        ArgumentGraph::from_serialized(&serialized).unwrap()
    }

    fn small_graph(prefix: &str) -> ArgumentGraph {
        graph(serde_json::json!({
            "id": prefix,
            "nodes": {
                format!("{prefix}a1"): {"type": "atom", "text": "birds can fly"},
                format!("{prefix}a2"): {"type": "atom", "text": "tweety is a bird"},
                format!("{prefix}s1"): {"type": "scheme", "scheme": {"kind": "support"}}
            },
            "edges": {
                format!("{prefix}e1"): {"source": format!("{prefix}a2"), "target": format!("{prefix}s1")},
                format!("{prefix}e2"): {"source": format!("{prefix}s1"), "target": format!("{prefix}a1")}
            }
        }))
    }

    #[test]
    fn identical_graphs_map_completely() {
        let query = small_graph("q");
        let case = small_graph("c");
        let mut kernel = kernel(StaticProvider::identity());
        let mapping = search_case(
            &mut kernel,
            &query,
            &case,
            SearchParams::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(mapping.len(), 5);
        assert!((mapping.similarity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn queue_limit_one_still_finds_the_full_mapping() {
        let query = small_graph("q");
        let case = small_graph("c");
        let mut kernel = kernel(StaticProvider::identity());
        let params = SearchParams {
            queue_limit: 1,
            ..SearchParams::default()
        };
        let mapping = search_case(
            &mut kernel,
            &query,
            &case,
            params,
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(mapping.len(), 5);
        assert!((mapping.similarity() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn type_mismatch_yields_empty_mapping() {
        let query = graph(serde_json::json!({
            "id": "q",
            "nodes": {
                "qa1": {"type": "atom", "text": "one"},
                "qa2": {"type": "atom", "text": "two"}
            },
            "edges": {}
        }));
        let case = graph(serde_json::json!({
            "id": "c",
            "nodes": {
                "cs1": {"type": "scheme", "scheme": {"kind": "support"}},
                "cs2": {"type": "scheme", "scheme": {"kind": "attack"}}
            },
            "edges": {}
        }));
        let mut kernel = kernel(StaticProvider::identity());
        let mapping = search_case(
            &mut kernel,
            &query,
            &case,
            SearchParams::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(mapping.is_empty());
        assert_eq!(mapping.similarity(), 0.0);
    }

    #[test]
    fn search_is_deterministic_for_a_fixed_seed() {
        let query = small_graph("q");
        let case = small_graph("c");
        let run = || {
            let mut kernel = kernel(StaticProvider::with(&[
                ("birds can fly", vec![1.0, 0.2, 0.0]),
                ("tweety is a bird", vec![0.4, 1.0, 0.1]),
            ]));
            let params = SearchParams {
                seed: 42,
                ..SearchParams::default()
            };
            search_case(
                &mut kernel,
                &query,
                &case,
                params,
                &CancellationToken::new(),
            )
            .unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second);
    }

    #[test]
    fn start_estimate_upper_bounds_the_result() {
        // Heuristic admissibility at the root: the best-pair bound can only
        // overestimate the final score.
        let query = small_graph("q");
        let case = small_graph("c");
        let mut kernel = kernel(StaticProvider::with(&[
            ("birds can fly", vec![1.0, 0.0]),
            ("tweety is a bird", vec![0.7, 0.7]),
        ]));
        let table = SimTable::build(&mut kernel, &query, &case).unwrap();
        let best_sum: f64 = query
            .atom_ids()
            .iter()
            .chain(query.scheme_ids().iter())
            .map(|id| table.best(&Element::Node(id.clone())))
            .chain(
                query
                    .edge_ids()
                    .iter()
                    .map(|id| table.best(&Element::Edge(id.clone()))),
            )
            .sum();
        let bound = best_sum / (query.node_count() + query.edge_count()) as f64;

        let mapping = a_star_search(
            &query,
            &case,
            &table,
            SearchParams::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(mapping.similarity() <= bound + 1e-9);
    }

    #[test]
    fn cancellation_aborts_the_search() {
        let query = small_graph("q");
        let case = small_graph("c");
        let mut kernel = kernel(StaticProvider::identity());
        let token = CancellationToken::new();
        token.cancel();
        let result = search_case(
            &mut kernel,
            &query,
            &case,
            SearchParams::default(),
            &token,
        );
        assert!(matches!(result, Err(RetrievalError::Cancelled)));
    }

    #[test]
    fn empty_query_returns_empty_mapping() {
        let query = graph(serde_json::json!({"id": "q", "nodes": {}, "edges": {}}));
        let case = small_graph("c");
        let mut kernel = kernel(StaticProvider::identity());
        let mapping = search_case(
            &mut kernel,
            &query,
            &case,
            SearchParams::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn baseline_heuristic_reaches_the_same_full_mapping_on_identity() {
        let query = small_graph("q");
        let case = small_graph("c");
        let mut kernel = kernel(StaticProvider::identity());
        let params = SearchParams {
            heuristic: Heuristic::Remaining,
            ..SearchParams::default()
        };
        let mapping = search_case(
            &mut kernel,
            &query,
            &case,
            params,
            &CancellationToken::new(),
        )
        .unwrap();
        assert!((mapping.similarity() - 1.0).abs() < 1e-9);
    }
}
