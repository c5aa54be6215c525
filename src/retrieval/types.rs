//! Request and response types for the retrieval dispatcher.

use crate::graph::{ArgumentGraph, SerializedGraph};
use crate::nlp::{NlpConfig, SchemeHandling};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which structural mapping algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingAlgorithm {
    /// Bounded-beam A* search (default)
    #[default]
    Astar,
    /// Label-abstracted subgraph monomorphism (benchmarking fallback)
    Isomorphism,
}

/// Free-form tunables carried alongside a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalExtras {
    /// Maximum A* frontier size kept after each expansion; 0 = unbounded
    pub astar_queue_limit: usize,
    /// Base seed mixed into each (query, case) search seed
    pub astar_seed: u64,
}

impl Default for RetrievalExtras {
    fn default() -> Self {
        Self {
            astar_queue_limit: 10_000,
            astar_seed: 0,
        }
    }
}

/// A query: either a full argument graph or raw text (prefilter only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Text(String),
    Graph(SerializedGraph),
}

/// Internal view of a parsed query.
pub(crate) enum QueryKind<'a> {
    Graph(&'a ArgumentGraph),
    Text(&'a str),
}

/// A retrieval request over a case base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieveRequest {
    /// The case base: id -> serialized graph
    pub cases: BTreeMap<String, SerializedGraph>,
    /// The queries: id -> graph or raw text
    pub queries: BTreeMap<String, QueryInput>,
    /// Ranking length; 0 = unlimited
    pub limit: usize,
    /// Run the semantic (MAC) stage
    pub semantic_retrieval: bool,
    /// Run the structural (FAC) stage
    pub structural_retrieval: bool,
    pub mapping_algorithm: MappingAlgorithm,
    pub scheme_handling: SchemeHandling,
    pub nlp_config: NlpConfig,
    pub extras: RetrievalExtras,
}

/// One ranked case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCase {
    pub id: String,
    pub similarity: f64,
}

/// One mapped element pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedElement {
    pub query_id: String,
    pub case_id: String,
    pub similarity: f64,
}

/// The explicit mapping for one structurally retrieved case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedMapping {
    pub case_id: String,
    pub node_mappings: Vec<MappedElement>,
    pub edge_mappings: Vec<MappedElement>,
}

/// Rankings and mappings for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub semantic_ranking: Vec<RetrievedCase>,
    pub structural_ranking: Vec<RetrievedCase>,
    pub structural_mappings: Vec<RetrievedMapping>,
}

/// The response over all queries. Queries that failed (e.g. malformed query
/// graphs) are reported per id; the rest of the batch still completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub query_responses: BTreeMap<String, QueryResponse>,
    pub failed_queries: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_with_defaults() {
        let request: RetrieveRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.limit, 0);
        assert_eq!(request.extras.astar_queue_limit, 10_000);
        assert_eq!(request.mapping_algorithm, MappingAlgorithm::Astar);
    }

    #[test]
    fn query_input_distinguishes_text_and_graph() {
        let text: QueryInput = serde_json::from_value(serde_json::json!("just some text")).unwrap();
        assert!(matches!(text, QueryInput::Text(_)));

        let graph: QueryInput = serde_json::from_value(serde_json::json!({
            "nodes": {"a1": {"type": "atom", "text": "hello"}}
        }))
        .unwrap();
        assert!(matches!(graph, QueryInput::Graph(_)));
    }

    #[test]
    fn unknown_algorithm_is_rejected_at_parse_time() {
        let result: Result<RetrieveRequest, _> = serde_json::from_value(serde_json::json!({
            "mapping_algorithm": "simulated_annealing"
        }));
        assert!(result.is_err());
    }
}
