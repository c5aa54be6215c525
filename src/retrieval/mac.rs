//! MAC ("many are called"): the cheap whole-graph semantic prefilter.
//!
//! Every case is compared against the query at the text level in one batched
//! kernel call. The dispatcher sorts the scores and hands only the top-L
//! cases to the structural stage, whose cost is superlinear in graph size.

use super::types::QueryKind;
use crate::graph::ArgumentGraph;
use crate::nlp::{GraphElement, ProviderError, SimilarityKernel};
use std::collections::{BTreeMap, HashMap};

/// Score every case against the query. Pure and idempotent: the same inputs
/// (and cache state) yield the same scores.
pub(crate) fn mac(
    kernel: &mut SimilarityKernel,
    cases: &BTreeMap<String, ArgumentGraph>,
    query: &QueryKind<'_>,
) -> Result<HashMap<String, f64>, ProviderError> {
    let query_element = match query {
        QueryKind::Graph(graph) => GraphElement::Graph(graph),
        QueryKind::Text(text) => GraphElement::Text(text),
    };

    let pairs: Vec<(GraphElement<'_>, GraphElement<'_>)> = cases
        .values()
        .map(|case| (GraphElement::Graph(case), query_element))
        .collect();

    let sims = kernel.sims(&pairs)?;

    Ok(cases.keys().cloned().zip(sims).collect())
}
