//! Node representation for argument graphs

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
///
/// Serializes as a plain string (UUID or semantic ID like "a1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a NodeId from a string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of argumentation scheme kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeKind {
    /// Premise supports conclusion
    Support,
    /// Premise attacks conclusion
    Attack,
    /// Restatement of another proposition
    Rephrase,
    /// Preference between two propositions
    Preference,
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchemeKind::Support => "support",
            SchemeKind::Attack => "attack",
            SchemeKind::Rephrase => "rephrase",
            SchemeKind::Preference => "preference",
        };
        write!(f, "{}", s)
    }
}

/// An argumentation scheme: a kind, optionally refined by a value from the
/// scheme taxonomy (e.g. "expert opinion").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub kind: SchemeKind,
    /// Taxonomy value refining the kind. Only meaningful for Support schemes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<String>,
}

impl Scheme {
    /// Create a scheme with just a kind
    pub fn new(kind: SchemeKind) -> Self {
        Self {
            kind,
            taxonomy: None,
        }
    }

    /// Set the taxonomy value (builder pattern)
    pub fn with_taxonomy(mut self, value: impl Into<String>) -> Self {
        self.taxonomy = Some(value.into());
        self
    }
}

/// A leaf proposition carrying free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomNode {
    pub id: NodeId,
    pub text: String,
}

/// An argument scheme instance. The scheme may be absent when the source
/// data does not specify one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeNode {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,
}

/// A node in an argument graph: either a leaf proposition (atom) or an
/// argumentation scheme instance. Tagged variant; the similarity kernel
/// matches on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Atom(AtomNode),
    Scheme(SchemeNode),
}

impl Node {
    /// Create a new atom node
    pub fn atom(id: impl Into<NodeId>, text: impl Into<String>) -> Self {
        Node::Atom(AtomNode {
            id: id.into(),
            text: text.into(),
        })
    }

    /// Create a new scheme node
    pub fn scheme(id: impl Into<NodeId>, scheme: Option<Scheme>) -> Self {
        Node::Scheme(SchemeNode {
            id: id.into(),
            scheme,
        })
    }

    /// The node's identifier
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Atom(n) => &n.id,
            Node::Scheme(n) => &n.id,
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Node::Atom(_))
    }

    pub fn is_scheme(&self) -> bool {
        matches!(self, Node::Scheme(_))
    }

    /// Check whether two nodes are the same variant (Atom/Atom or Scheme/Scheme)
    pub fn same_variant(&self, other: &Node) -> bool {
        matches!(
            (self, other),
            (Node::Atom(_), Node::Atom(_)) | (Node::Scheme(_), Node::Scheme(_))
        )
    }

    pub fn as_atom(&self) -> Option<&AtomNode> {
        match self {
            Node::Atom(n) => Some(n),
            Node::Scheme(_) => None,
        }
    }

    pub fn as_scheme(&self) -> Option<&SchemeNode> {
        match self {
            Node::Scheme(n) => Some(n),
            Node::Atom(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_node_serde_round_trip() {
        let node = Node::atom("a1", "birds can fly");
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""type":"atom""#));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn scheme_node_serde_round_trip() {
        let node = Node::scheme(
            "s1",
            Some(Scheme::new(SchemeKind::Support).with_taxonomy("expert opinion")),
        );
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""type":"scheme""#));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn scheme_node_without_scheme_omits_field() {
        let node = Node::scheme("s1", None);
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("scheme"));
    }

    #[test]
    fn same_variant_distinguishes_atoms_and_schemes() {
        let a = Node::atom("a1", "x");
        let b = Node::atom("a2", "y");
        let s = Node::scheme("s1", None);
        assert!(a.same_variant(&b));
        assert!(!a.same_variant(&s));
        assert!(s.same_variant(&s));
    }
}
