//! Arguecase: Case-Based Retrieval for Argument Graphs
//!
//! A two-stage retrieval engine over typed argument graphs. The semantic
//! stage (MAC, "many are called") ranks the case base by cheap whole-graph
//! text similarity; the structural stage (FAC, "few are chosen") runs a
//! bounded-beam A\* search per surviving case to find the best injective
//! partial mapping between query and case elements.
//!
//! # Core Concepts
//!
//! - **Atom nodes**: leaf propositions carrying free text
//! - **Scheme nodes**: argumentation scheme instances (support, attack, ...),
//!   optionally refined by a taxonomy value
//! - **Mappings**: injective, type-consistent pairings of query and case
//!   elements, scored against the query's fixed element totals
//!
//! # Example
//!
//! ```
//! use arguecase::Taxonomy;
//!
//! let taxonomy = Taxonomy::from_yaml_str(
//!     "val: root\nchildren:\n  - val: expert opinion\n",
//! )?;
//! assert_eq!(taxonomy.wu_palmer(Some("expert opinion"), Some("expert opinion")), 1.0);
//! # Ok::<(), arguecase::TaxonomyError>(())
//! ```

mod api;
pub mod graph;
pub mod nlp;
pub mod retrieval;
mod taxonomy;

pub use api::RetrievalApi;
pub use graph::{
    ArgumentGraph, AtomNode, Edge, EdgeId, GraphError, GraphId, GraphTextAlgorithm, Node, NodeId,
    Scheme, SchemeKind, SchemeNode, SerializedEdge, SerializedGraph, SerializedNode,
};
pub use nlp::{
    EmbeddingLevel, EmbeddingProvider, HashingProvider, NlpConfig, ProviderError, SchemeHandling,
    SimilarityMethod, TextVectors,
};
pub use retrieval::{
    CancellationToken, MappedElement, Mapping, MappingAlgorithm, QueryInput, QueryResponse,
    RetrievalError, RetrievalExtras, RetrieveRequest, RetrieveResponse, RetrievedCase,
    RetrievedMapping,
};
pub use taxonomy::{Taxonomy, TaxonomyError};

#[cfg(feature = "embeddings")]
pub use nlp::FastEmbedProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
