//! NLP layer: embedding provider contract, per-request vector cache,
//! similarity measures, and the element-wise similarity kernel.

mod cache;
mod kernel;
mod measure;
mod provider;

pub use cache::VectorCache;
pub use kernel::{GraphElement, SchemeHandling, SimilarityKernel};
pub use measure::{cosine, dynamax_dice, dynamax_jaccard, dynamax_otsuka, maxpool_jaccard, SimilarityMethod};
pub use provider::{EmbeddingLevel, EmbeddingProvider, HashingProvider, ProviderError, TextVectors};

#[cfg(feature = "embeddings")]
pub use provider::FastEmbedProvider;

use crate::graph::GraphTextAlgorithm;
use serde::{Deserialize, Serialize};

/// Embedding-provider configuration carried by each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlpConfig {
    /// Language of the texts (provider hint)
    pub language: String,
    /// Embedding model identifier; provider default when absent
    pub embedding_model: Option<String>,
    /// Measure used for text comparisons
    pub similarity_method: SimilarityMethod,
    /// How graphs are flattened into text for the semantic prefilter
    pub graph_text: GraphTextAlgorithm,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            embedding_model: None,
            similarity_method: SimilarityMethod::default(),
            graph_text: GraphTextAlgorithm::default(),
        }
    }
}
