//! Two-stage retrieval: the MAC semantic prefilter and the FAC structural
//! search with explicit mappings, plus the shared mapping state and request
//! and response types.

pub mod astar;
mod cancel;
mod isomorphism;
mod mac;
mod mapping;
mod simtable;
mod types;

pub use cancel::CancellationToken;
pub use mapping::{EdgeMapping, Element, Mapping, MappingError, NodeMapping};
pub use types::{
    MappedElement, MappingAlgorithm, QueryInput, QueryResponse, RetrievalExtras, RetrieveRequest,
    RetrieveResponse, RetrievedCase, RetrievedMapping,
};

pub(crate) use mac::mac;
pub(crate) use types::QueryKind;

use crate::graph::{ArgumentGraph, GraphError};
use crate::nlp::{EmbeddingProvider, NlpConfig, ProviderError, SchemeHandling, SimilarityKernel};
use crate::taxonomy::Taxonomy;
use astar::SearchParams;
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the retrieval dispatcher
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Unknown or inconsistent request options; rejected before computation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed graph: {0}")]
    Graph(#[from] GraphError),

    /// The embedding provider failed after retries
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// A search invariant was violated; a bug, not an input property
    #[error("internal error: {0}")]
    Internal(String),

    #[error("request cancelled")]
    Cancelled,
}

impl From<ProviderError> for RetrievalError {
    fn from(error: ProviderError) -> Self {
        RetrievalError::Unavailable(error.to_string())
    }
}

/// The structural result for one case.
#[derive(Debug, Clone)]
pub(crate) struct FacOutcome {
    pub case_id: String,
    pub similarity: f64,
    pub mapping: Mapping,
}

/// Everything one FAC worker needs. Shared state (provider, taxonomy) is
/// immutable; each worker builds its own kernel with a worker-local cache.
pub(crate) struct FacContext<'a> {
    pub provider: &'a Arc<dyn EmbeddingProvider>,
    pub taxonomy: &'a Arc<Taxonomy>,
    pub nlp_config: &'a NlpConfig,
    pub scheme_handling: SchemeHandling,
    pub algorithm: MappingAlgorithm,
    pub queue_limit: usize,
    pub base_seed: u64,
    pub query_id: &'a str,
    pub cancel: &'a CancellationToken,
}

/// Run the structural stage over the frozen case set.
///
/// Cases are independent, so they run data-parallel on `pool`; `sequential`
/// forces in-thread execution with identical results (per-case seeding makes
/// the two modes indistinguishable). Internal errors abort only their own
/// (query, case) pair; cancellation and provider failures abort the batch.
pub(crate) fn fac(
    context: &FacContext<'_>,
    pool: &rayon::ThreadPool,
    query: &ArgumentGraph,
    cases: &[(&str, &ArgumentGraph)],
    sequential: bool,
) -> Result<Vec<FacOutcome>, RetrievalError> {
    tracing::info!(query = context.query_id, cases = cases.len(), "structural search");

    let results: Vec<Result<FacOutcome, RetrievalError>> = if sequential {
        cases
            .iter()
            .map(|(id, case)| run_case(context, query, id, case))
            .collect()
    } else {
        pool.install(|| {
            cases
                .par_iter()
                .map(|(id, case)| run_case(context, query, id, case))
                .collect()
        })
    };

    let mut outcomes = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(RetrievalError::Internal(message)) => {
                // A violated search invariant is a bug: drop this pair, keep
                // the rest of the batch.
                tracing::error!(query = context.query_id, error = %message, "search invariant violated");
            }
            Err(other) => return Err(other),
        }
    }
    Ok(outcomes)
}

fn run_case(
    context: &FacContext<'_>,
    query: &ArgumentGraph,
    case_id: &str,
    case: &ArgumentGraph,
) -> Result<FacOutcome, RetrievalError> {
    if context.cancel.is_cancelled() {
        return Err(RetrievalError::Cancelled);
    }

    let mut kernel = SimilarityKernel::new(
        Arc::clone(context.provider),
        Arc::clone(context.taxonomy),
        context.nlp_config.clone(),
        context.scheme_handling,
    );

    match context.algorithm {
        MappingAlgorithm::Astar => {
            let params = SearchParams {
                queue_limit: context.queue_limit,
                seed: case_seed(context.base_seed, context.query_id, case_id),
                ..SearchParams::default()
            };
            let mapping = astar::search_case(&mut kernel, query, case, params, context.cancel)?;
            Ok(FacOutcome {
                case_id: case_id.to_string(),
                similarity: mapping.similarity(),
                mapping,
            })
        }
        MappingAlgorithm::Isomorphism => {
            let (similarity, mapping) = isomorphism::search_case(
                &mut kernel,
                query,
                case,
                context.scheme_handling,
                context.cancel,
            )?;
            Ok(FacOutcome {
                case_id: case_id.to_string(),
                similarity,
                mapping,
            })
        }
    }
}

/// Stable per-(query, case) seed so parallel execution is reproducible.
fn case_seed(base: u64, query_id: &str, case_id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in query_id.bytes().chain([0u8]).chain(case_id.bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash ^ base
}
