//! Scheme taxonomy: a tree of argumentation-scheme names with Wu–Palmer
//! similarity between two values.
//!
//! The tree is loaded once at process start from a YAML file and shared
//! read-only behind an `Arc`. Nodes live in a flat arena indexed by position;
//! `parent` is an index, so there are no cyclic pointers.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a taxonomy file
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse taxonomy file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The wire form of a taxonomy node: a value and its children.
#[derive(Debug, Deserialize)]
pub struct SerializedTaxonomy {
    pub val: String,
    #[serde(default)]
    pub children: Vec<SerializedTaxonomy>,
}

#[derive(Debug)]
struct TaxonomyNode {
    depth: usize,
    parent: Option<usize>,
}

/// An immutable scheme taxonomy with Wu–Palmer similarity.
#[derive(Debug)]
pub struct Taxonomy {
    nodes: Vec<TaxonomyNode>,
    /// Case-normalised value -> arena index
    index: HashMap<String, usize>,
    root: usize,
}

impl Taxonomy {
    /// Load a taxonomy from a YAML file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Load a taxonomy from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TaxonomyError> {
        let serialized: SerializedTaxonomy = serde_yaml::from_str(yaml)?;
        Ok(Self::from_serialized(&serialized))
    }

    /// Build the arena from the parsed tree.
    pub fn from_serialized(serialized: &SerializedTaxonomy) -> Self {
        let mut taxonomy = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            root: 0,
        };
        taxonomy.insert(serialized, 0, None);
        taxonomy
    }

    /// A taxonomy with only a root node. Every lookup resolves to the root,
    /// so all known-vs-known comparisons yield 1.0 via the absent-scheme rule
    /// and 0.0 otherwise. Useful when no taxonomy file is configured.
    pub fn empty() -> Self {
        Self::from_serialized(&SerializedTaxonomy {
            val: "root".to_string(),
            children: Vec::new(),
        })
    }

    fn insert(&mut self, node: &SerializedTaxonomy, depth: usize, parent: Option<usize>) {
        let idx = self.nodes.len();
        self.nodes.push(TaxonomyNode { depth, parent });
        self.index.insert(normalize(&node.val), idx);
        for child in &node.children {
            self.insert(child, depth + 1, Some(idx));
        }
    }

    /// Number of nodes in the taxonomy
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Wu–Palmer similarity of two scheme values: `2·depth(lca) / (depth(a) +
    /// depth(b))`.
    ///
    /// Unknown values fall back to the root. An absent value on either side
    /// returns 1.0 (two unspecified schemes are considered compatible).
    pub fn wu_palmer(&self, a: Option<&str>, b: Option<&str>) -> f64 {
        let (Some(a), Some(b)) = (a, b) else {
            return 1.0;
        };

        let mut node_a = self.resolve(a);
        let mut node_b = self.resolve(b);
        let depth_a = self.nodes[node_a].depth;
        let depth_b = self.nodes[node_b].depth;

        if depth_a + depth_b == 0 {
            // Both resolved to the root; identical by construction.
            return 1.0;
        }

        // Lift the deeper node until both sit at equal depth, then lift both
        // until they meet.
        while node_a != node_b {
            let (da, db) = (self.nodes[node_a].depth, self.nodes[node_b].depth);
            let lifted = if da >= db {
                &mut node_a
            } else {
                &mut node_b
            };
            match self.nodes[*lifted].parent {
                Some(parent) => *lifted = parent,
                None => return 0.0,
            }
        }

        let meeting_depth = self.nodes[node_a].depth;
        (2 * meeting_depth) as f64 / (depth_a + depth_b) as f64
    }

    fn resolve(&self, value: &str) -> usize {
        self.index
            .get(&normalize(value))
            .copied()
            .unwrap_or(self.root)
    }
}

/// Lower-case and strip the "argument from " prefix scheme names often carry.
fn normalize(value: &str) -> String {
    let lowered = value.to_lowercase();
    lowered
        .strip_prefix("argument from ")
        .unwrap_or(&lowered)
        .to_string()
}
