//! Transport-independent API layer.
//!
//! [`RetrievalApi`] is the single entry point for consumers: an RPC handler,
//! the CLI, or a direct embedding all call [`RetrievalApi::retrieve`] and
//! never reach into the retrieval internals. Per query it runs the semantic
//! prefilter, freezes the top-L case set, runs the structural search across
//! it in parallel, and assembles rankings plus explicit mappings.

use crate::graph::ArgumentGraph;
use crate::nlp::{EmbeddingProvider, SimilarityKernel};
use crate::retrieval::{
    fac, mac, CancellationToken, FacContext, FacOutcome, MappedElement, QueryInput, QueryKind,
    QueryResponse, RetrievalError, RetrieveRequest, RetrieveResponse, RetrievedCase,
    RetrievedMapping,
};
use crate::taxonomy::Taxonomy;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Single entry point for all consumer-facing retrieval operations.
pub struct RetrievalApi {
    provider: Arc<dyn EmbeddingProvider>,
    taxonomy: Arc<Taxonomy>,
    pool: rayon::ThreadPool,
    sequential: bool,
}

impl RetrievalApi {
    /// Create a new API instance with a worker pool sized to the available
    /// CPUs.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        taxonomy: Arc<Taxonomy>,
    ) -> Result<Self, RetrievalError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_cpus::get())
            .build()
            .map_err(|e| RetrievalError::Internal(e.to_string()))?;
        Ok(Self {
            provider,
            taxonomy,
            pool,
            sequential: false,
        })
    }

    /// Force in-thread execution of the structural stage (debug mode).
    /// Results are identical to parallel execution.
    pub fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }

    /// Process a retrieval request.
    pub fn retrieve(&self, request: &RetrieveRequest) -> Result<RetrieveResponse, RetrievalError> {
        self.retrieve_with_cancel(request, &CancellationToken::new())
    }

    /// Process a retrieval request with cooperative cancellation. The token
    /// is checked between queries, after each prefilter batch, between cases,
    /// and inside every search iteration.
    pub fn retrieve_with_cancel(
        &self,
        request: &RetrieveRequest,
        cancel: &CancellationToken,
    ) -> Result<RetrieveResponse, RetrievalError> {
        if !request.semantic_retrieval && !request.structural_retrieval {
            return Err(RetrievalError::InvalidRequest(
                "at least one retrieval stage must be requested".to_string(),
            ));
        }

        // Malformed case graphs are skipped; the batch continues without
        // them. Malformed query graphs fail only their own query.
        let mut cases: BTreeMap<String, ArgumentGraph> = BTreeMap::new();
        for (id, serialized) in &request.cases {
            match ArgumentGraph::from_serialized(serialized) {
                Ok(graph) => {
                    cases.insert(id.clone(), graph);
                }
                Err(error) => {
                    tracing::warn!(case = %id, error = %error, "skipping malformed case graph");
                }
            }
        }

        let mut response = RetrieveResponse::default();

        for (query_id, input) in &request.queries {
            if cancel.is_cancelled() {
                return Err(RetrievalError::Cancelled);
            }
            match self.run_query(request, &cases, query_id, input, cancel) {
                Ok(query_response) => {
                    response
                        .query_responses
                        .insert(query_id.clone(), query_response);
                }
                Err(RetrievalError::InvalidRequest(message)) => {
                    tracing::warn!(query = %query_id, error = %message, "query failed");
                    response.failed_queries.insert(query_id.clone(), message);
                }
                Err(other) => return Err(other),
            }
        }

        Ok(response)
    }

    fn run_query(
        &self,
        request: &RetrieveRequest,
        cases: &BTreeMap<String, ArgumentGraph>,
        query_id: &str,
        input: &QueryInput,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse, RetrievalError> {
        let query_graph = match input {
            QueryInput::Graph(serialized) => Some(
                ArgumentGraph::from_serialized(serialized).map_err(|e| {
                    RetrievalError::InvalidRequest(format!("malformed query graph: {e}"))
                })?,
            ),
            QueryInput::Text(_) => None,
        };

        if query_graph.is_none() && request.structural_retrieval && !request.semantic_retrieval {
            return Err(RetrievalError::InvalidRequest(
                "structural retrieval requires a graph query".to_string(),
            ));
        }

        let mut response = QueryResponse::default();

        // --- Semantic stage (MAC) ---
        if request.semantic_retrieval {
            tracing::info!(query = query_id, cases = cases.len(), "semantic prefilter");
            let mut kernel = SimilarityKernel::new(
                Arc::clone(&self.provider),
                Arc::clone(&self.taxonomy),
                request.nlp_config.clone(),
                request.scheme_handling,
            );
            let query_kind = match (&query_graph, input) {
                (Some(graph), _) => QueryKind::Graph(graph),
                (None, QueryInput::Text(text)) => QueryKind::Text(text),
                // A graph input always parses to Some above.
                (None, QueryInput::Graph(_)) => unreachable!(),
            };
            let scores = mac(&mut kernel, cases, &query_kind)?;
            response.semantic_ranking = rank(scores, request.limit);
            if cancel.is_cancelled() {
                return Err(RetrievalError::Cancelled);
            }
        }

        // --- Structural stage (FAC) ---
        if request.structural_retrieval {
            if let Some(query_graph) = &query_graph {
                // The post-MAC top-L set is frozen before workers start; with
                // MAC skipped, every case participates.
                let fac_cases: Vec<(&str, &ArgumentGraph)> = if request.semantic_retrieval {
                    response
                        .semantic_ranking
                        .iter()
                        .filter_map(|entry| {
                            cases
                                .get(&entry.id)
                                .map(|graph| (entry.id.as_str(), graph))
                        })
                        .collect()
                } else {
                    cases
                        .iter()
                        .map(|(id, graph)| (id.as_str(), graph))
                        .collect()
                };

                let context = FacContext {
                    provider: &self.provider,
                    taxonomy: &self.taxonomy,
                    nlp_config: &request.nlp_config,
                    scheme_handling: request.scheme_handling,
                    algorithm: request.mapping_algorithm,
                    queue_limit: request.extras.astar_queue_limit,
                    base_seed: request.extras.astar_seed,
                    query_id,
                    cancel,
                };
                let outcomes = fac(&context, &self.pool, query_graph, &fac_cases, self.sequential)?;

                let mut mappings: HashMap<String, FacOutcome> = HashMap::new();
                let mut scores: HashMap<String, f64> = HashMap::new();
                for outcome in outcomes {
                    scores.insert(outcome.case_id.clone(), outcome.similarity);
                    mappings.insert(outcome.case_id.clone(), outcome);
                }

                response.structural_ranking = rank(scores, request.limit);
                response.structural_mappings = response
                    .structural_ranking
                    .iter()
                    .filter_map(|entry| mappings.get(&entry.id))
                    .map(retrieved_mapping)
                    .collect();
            }
        }

        Ok(response)
    }
}

/// Stable ranking: similarity descending, id ascending; truncated to `limit`
/// unless it is 0.
fn rank(scores: HashMap<String, f64>, limit: usize) -> Vec<RetrievedCase> {
    let mut entries: Vec<RetrievedCase> = scores
        .into_iter()
        .map(|(id, similarity)| RetrievedCase { id, similarity })
        .collect();
    entries.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    if limit > 0 {
        entries.truncate(limit);
    }
    entries
}

fn retrieved_mapping(outcome: &FacOutcome) -> RetrievedMapping {
    RetrievedMapping {
        case_id: outcome.case_id.clone(),
        node_mappings: outcome
            .mapping
            .node_mappings()
            .map(|m| MappedElement {
                query_id: m.query_id.to_string(),
                case_id: m.case_id.to_string(),
                similarity: m.similarity,
            })
            .collect(),
        edge_mappings: outcome
            .mapping
            .edge_mappings()
            .map(|m| MappedElement {
                query_id: m.query_id.to_string(),
                case_id: m.case_id.to_string(),
                similarity: m.similarity,
            })
            .collect(),
    }
}
