//! Shared helpers for the retrieval integration tests: a deterministic
//! embedding provider and argument graph builders.

#![allow(dead_code)]

use arguecase::{
    EmbeddingLevel, EmbeddingProvider, NlpConfig, ProviderError, SerializedGraph, TextVectors,
};
use std::collections::HashMap;

/// Deterministic provider: fixed vectors for registered texts, a stable
/// hash-slot unit vector for everything else. Identical texts are always
/// maximally similar; distinct unregistered texts land in (usually)
/// different slots.
pub struct StaticProvider {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self {
            vectors: HashMap::new(),
        }
    }

    pub fn with(entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
        }
    }

    fn fallback(text: &str) -> Vec<f32> {
        let code = text.bytes().map(u64::from).sum::<u64>() % 7;
        let mut vector = vec![0.0; 8];
        vector[code as usize] = 1.0;
        vector
    }
}

impl EmbeddingProvider for StaticProvider {
    fn vectors(
        &self,
        texts: &[&str],
        level: EmbeddingLevel,
        _config: &NlpConfig,
    ) -> Result<Vec<TextVectors>, ProviderError> {
        Ok(texts
            .iter()
            .map(|text| {
                let document = self
                    .vectors
                    .get(*text)
                    .cloned()
                    .unwrap_or_else(|| Self::fallback(text));
                match level {
                    EmbeddingLevel::Document => TextVectors::Document(document),
                    // Token-level fixtures: one vector per whitespace token.
                    EmbeddingLevel::Tokens => TextVectors::Tokens(
                        text.split_whitespace().map(Self::fallback).collect(),
                    ),
                }
            })
            .collect())
    }
}

/// A case vector at the given cosine similarity to the unit query vector
/// `[1, 0]`.
pub fn at_cosine(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt()]
}

/// A graph with a single atom node.
pub fn atom_graph(id: &str, text: &str) -> SerializedGraph {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "nodes": {"a1": {"type": "atom", "text": text}},
        "edges": {}
    }))
    .unwrap()
}

/// A small argument: two premises feeding a support scheme feeding a claim.
/// 4 nodes, 3 edges.
pub fn argument_graph(id: &str) -> SerializedGraph {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "nodes": {
            "a1": {"type": "atom", "text": "birds can fly"},
            "a2": {"type": "atom", "text": "tweety is a bird"},
            "a3": {"type": "atom", "text": "tweety can fly"},
            "s1": {"type": "scheme", "scheme": {"kind": "support"}}
        },
        "edges": {
            "e1": {"source": "a1", "target": "s1"},
            "e2": {"source": "a2", "target": "s1"},
            "e3": {"source": "s1", "target": "a3"}
        }
    }))
    .unwrap()
}

/// A graph with `n` atom nodes sharing one text, no edges.
pub fn uniform_atoms(id: &str, n: usize, text: &str) -> SerializedGraph {
    let nodes: serde_json::Map<String, serde_json::Value> = (1..=n)
        .map(|i| {
            (
                format!("a{i}"),
                serde_json::json!({"type": "atom", "text": text}),
            )
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "id": id,
        "nodes": nodes,
        "edges": {}
    }))
    .unwrap()
}

/// The taxonomy used by the scheme-similarity scenarios: `deep` sits at
/// depth 4, `left` at depth 3, and their deepest common ancestor `l2` at
/// depth 2.
pub const TAXONOMY: &str = "\
val: root
children:
  - val: l1
    children:
      - val: l2
        children:
          - val: left
          - val: mid
            children:
              - val: deep
  - val: other
";
