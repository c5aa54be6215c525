//! Argument graph model: typed nodes, directed multigraph edges, and the
//! immutable graph structure built from a serialized form.

mod edge;
mod model;
mod node;
mod text;

pub use edge::{Edge, EdgeId};
pub use model::{
    ArgumentGraph, GraphError, GraphId, SerializedEdge, SerializedGraph, SerializedNode,
};
pub use node::{AtomNode, Node, NodeId, Scheme, SchemeKind, SchemeNode};
pub use text::{render, GraphTextAlgorithm};
