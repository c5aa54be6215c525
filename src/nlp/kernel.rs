//! The similarity kernel: element-wise similarity between graph elements.
//!
//! One kernel exists per request (or per FAC worker). It owns the
//! worker-local vector cache and shares the embedding provider and taxonomy
//! immutably, so workers never contend on mutable state.

use super::cache::VectorCache;
use super::measure::{self, SimilarityMethod};
use super::provider::{EmbeddingProvider, ProviderError};
use super::NlpConfig;
use crate::graph::{
    render, ArgumentGraph, Edge, GraphTextAlgorithm, Node, NodeId, SchemeKind, SchemeNode,
};
use crate::taxonomy::Taxonomy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// How scheme nodes are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeHandling {
    /// Every scheme pair scores 1.0
    #[default]
    Unspecified,
    /// 1.0 iff both schemes have the same kind
    Binary,
    /// Wu–Palmer taxonomy similarity for Support pairs, kind equality
    /// otherwise
    Taxonomy,
    /// 1.0 iff the scheme values are equal
    Exact,
}

/// Anything the kernel can compare.
#[derive(Clone, Copy)]
pub enum GraphElement<'a> {
    Node(&'a Node),
    Edge {
        edge: &'a Edge,
        graph: &'a ArgumentGraph,
    },
    Graph(&'a ArgumentGraph),
    Text(&'a str),
}

/// Element-wise similarity with a worker-local vector cache.
pub struct SimilarityKernel {
    provider: Arc<dyn EmbeddingProvider>,
    taxonomy: Arc<Taxonomy>,
    config: NlpConfig,
    scheme_handling: SchemeHandling,
    cache: VectorCache,
}

/// A node pair reduced to either a text comparison or a fixed score.
enum NodePair<'a> {
    Text(&'a str, &'a str),
    Fixed(f64),
}

/// A pair reduced to the work it still needs after policy dispatch.
enum Prepared<'a> {
    Fixed(f64),
    Text(Cow<'a, str>, Cow<'a, str>),
    Edge(NodePair<'a>, NodePair<'a>),
}

impl SimilarityKernel {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        taxonomy: Arc<Taxonomy>,
        config: NlpConfig,
        scheme_handling: SchemeHandling,
    ) -> Self {
        Self {
            provider,
            taxonomy,
            config,
            scheme_handling,
            cache: VectorCache::new(),
        }
    }

    /// Similarity of a single element pair in [0, 1].
    pub fn sim(&mut self, a: GraphElement<'_>, b: GraphElement<'_>) -> Result<f64, ProviderError> {
        Ok(self.sims(&[(a, b)])?[0])
    }

    /// Batch similarity: all texts missing from the cache are fetched with a
    /// single provider call before any pair is scored.
    pub fn sims(
        &mut self,
        pairs: &[(GraphElement<'_>, GraphElement<'_>)],
    ) -> Result<Vec<f64>, ProviderError> {
        let prepared: Vec<Prepared> = pairs.iter().map(|(a, b)| self.prepare(*a, *b)).collect();

        // Prefetch every text any pair needs in one batch.
        let mut texts: Vec<&str> = Vec::new();
        for pair in &prepared {
            match pair {
                Prepared::Text(a, b) => {
                    texts.push(a.as_ref());
                    texts.push(b.as_ref());
                }
                Prepared::Edge(source, target) => {
                    for endpoint in [source, target] {
                        if let NodePair::Text(a, b) = endpoint {
                            texts.push(*a);
                            texts.push(*b);
                        }
                    }
                }
                Prepared::Fixed(_) => {}
            }
        }
        if !texts.is_empty() {
            let level = self.config.similarity_method.embedding_level();
            self.cache
                .fetch(&*self.provider, &self.config, level, &texts)?;
        }

        prepared.iter().map(|pair| self.score(pair)).collect()
    }

    fn prepare<'a>(&self, a: GraphElement<'a>, b: GraphElement<'a>) -> Prepared<'a> {
        match (a, b) {
            (GraphElement::Node(x), GraphElement::Node(y)) => match self.prepare_nodes(x, y) {
                NodePair::Text(t1, t2) => Prepared::Text(Cow::Borrowed(t1), Cow::Borrowed(t2)),
                NodePair::Fixed(value) => Prepared::Fixed(value),
            },
            (
                GraphElement::Edge {
                    edge: e1,
                    graph: g1,
                },
                GraphElement::Edge {
                    edge: e2,
                    graph: g2,
                },
            ) => {
                let endpoint = |q: &'a NodeId, c: &'a NodeId| match (g1.node(q), g2.node(c)) {
                    (Some(x), Some(y)) => self.prepare_nodes(x, y),
                    _ => NodePair::Fixed(0.0),
                };
                Prepared::Edge(
                    endpoint(&e1.source, &e2.source),
                    endpoint(&e1.target, &e2.target),
                )
            }
            (
                GraphElement::Graph(_) | GraphElement::Text(_),
                GraphElement::Graph(_) | GraphElement::Text(_),
            ) => Prepared::Text(self.element_text(a), self.element_text(b)),
            _ => Prepared::Fixed(0.0),
        }
    }

    fn prepare_nodes<'a>(&self, x: &'a Node, y: &'a Node) -> NodePair<'a> {
        match (x, y) {
            (Node::Atom(a), Node::Atom(b)) => NodePair::Text(&a.text, &b.text),
            (Node::Scheme(a), Node::Scheme(b)) => NodePair::Fixed(self.scheme_sim(a, b)),
            _ => NodePair::Fixed(0.0),
        }
    }

    fn element_text<'a>(&self, element: GraphElement<'a>) -> Cow<'a, str> {
        match element {
            GraphElement::Text(text) => Cow::Borrowed(text),
            GraphElement::Graph(graph) => match self.config.graph_text {
                GraphTextAlgorithm::NodeId => Cow::Borrowed(graph.text()),
                other => Cow::Owned(render(graph, other)),
            },
            // prepare() only routes graph/text pairings here.
            GraphElement::Node(_) | GraphElement::Edge { .. } => Cow::Borrowed(""),
        }
    }

    fn score(&mut self, pair: &Prepared<'_>) -> Result<f64, ProviderError> {
        match pair {
            Prepared::Fixed(value) => Ok(*value),
            Prepared::Text(a, b) => self.text_sim(a.as_ref(), b.as_ref()),
            Prepared::Edge(source, target) => {
                let source_sim = self.node_pair_sim(source)?;
                let target_sim = self.node_pair_sim(target)?;
                Ok(0.5 * (source_sim + target_sim))
            }
        }
    }

    fn node_pair_sim(&mut self, pair: &NodePair<'_>) -> Result<f64, ProviderError> {
        match pair {
            NodePair::Fixed(value) => Ok(*value),
            NodePair::Text(a, b) => self.text_sim(a, b),
        }
    }

    fn text_sim(&mut self, a: &str, b: &str) -> Result<f64, ProviderError> {
        let method = self.config.similarity_method;
        let vectors =
            self.cache
                .fetch(&*self.provider, &self.config, method.embedding_level(), &[a, b])?;
        Ok(measure::score(method, &vectors[0], &vectors[1]))
    }

    /// Scheme similarity under the configured handling policy.
    fn scheme_sim(&self, a: &SchemeNode, b: &SchemeNode) -> f64 {
        match self.scheme_handling {
            SchemeHandling::Unspecified => 1.0,
            SchemeHandling::Binary => match (&a.scheme, &b.scheme) {
                (Some(x), Some(y)) if x.kind == y.kind => 1.0,
                (None, None) => 1.0,
                _ => 0.0,
            },
            SchemeHandling::Taxonomy => match (&a.scheme, &b.scheme) {
                (Some(x), Some(y))
                    if x.kind == SchemeKind::Support && y.kind == SchemeKind::Support =>
                {
                    self.taxonomy
                        .wu_palmer(x.taxonomy.as_deref(), y.taxonomy.as_deref())
                }
                (Some(x), Some(y)) if x.kind == y.kind => 1.0,
                (Some(_), Some(_)) => 0.0,
                (None, None) => 1.0,
                _ => 0.0,
            },
            SchemeHandling::Exact => {
                if a.scheme == b.scheme {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Number of texts currently cached (test hook).
    #[cfg(test)]
    pub(crate) fn cached_texts(&self) -> usize {
        self.cache.len()
    }
}
