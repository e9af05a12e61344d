//! docgraph Graph
//!
//! Projection of a canonical document into an addressable node/edge graph,
//! plus the collapse/expand algebra the renderer filters it through.
//!
//! # Core Concepts
//!
//! - [`to_graph`]: Pure, iterative tree-to-graph transform
//! - [`Graph`]: Immutable projection with parent/child indexes
//! - [`CollapseState`]: Collapsed parents and the nodes/edges they hide
//!
//! # Example
//!
//! ```rust
//! use docgraph_graph::{to_graph, CollapseState};
//! use serde_json::json;
//!
//! let graph = to_graph(&json!({"fruit": {"name": "Apple"}}));
//! assert_eq!(graph.node_count(), 3);
//!
//! let mut state = CollapseState::new();
//! state.collapse(&graph, "{Root}.fruit");
//! assert!(state.is_node_hidden("{Root}.fruit.name"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod collapse;
mod graph;
mod node;
mod transform;

pub use collapse::{CollapseOutcome, CollapseState};
pub use graph::{Graph, OverflowError};
pub use node::{Edge, EdgeId, Node, NodeData, NodeId, NodeText, ValueKind};
pub use transform::{summary, to_graph};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
