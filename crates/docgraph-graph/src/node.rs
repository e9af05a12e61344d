//! Graph node and edge types
//!
//! Nodes are identified by their display path, so re-projecting the same
//! document yields the same ids.

use docgraph_document::{DocPath, Segment};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

/// Node identity (the node's display path)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id of the node at `path`
    #[inline]
    #[must_use]
    pub fn from_path(path: &DocPath) -> Self {
        Self(path.encode())
    }

    /// Id text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Edge identity, derived from the target node (one incoming edge each)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Id of the edge ending at `to`
    #[inline]
    #[must_use]
    pub fn to_node(to: &NodeId) -> Self {
        Self(format!("edge:{to}"))
    }

    /// Id text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EdgeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EdgeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of value a node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl ValueKind {
    /// Kind of `value`
    #[inline]
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Null => Self::Null,
        }
    }

    /// Object or array
    #[inline]
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }
}

/// What a node displays
///
/// Resolved once during projection; consumers never re-infer it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeText {
    /// Scalar value
    Scalar(Value),
    /// `(key or index, summary)` for each child, in document order
    Container(Vec<(String, String)>),
}

impl NodeText {
    /// Scalar value, if any
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Container(_) => None,
        }
    }

    /// Child pairs, if a container
    #[inline]
    #[must_use]
    pub fn pairs(&self) -> Option<&[(String, String)]> {
        match self {
            Self::Scalar(_) => None,
            Self::Container(pairs) => Some(pairs),
        }
    }
}

/// Per-node metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Value kind
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Object or array
    pub is_parent: bool,
    /// Number of direct children
    pub children_count: usize,
    /// Empty object or array
    pub is_empty: bool,
}

/// One visual unit of the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub text: NodeText,
    pub path: DocPath,
    pub data: NodeData,
}

impl Node {
    /// Key or index this node hangs off its parent by (`None` for the root)
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&Segment> {
        self.path.last()
    }

    /// Non-empty object or array
    #[inline]
    #[must_use]
    pub fn is_expandable(&self) -> bool {
        self.data.is_parent && !self.data.is_empty
    }
}

/// Directed arc from a container to a direct child
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
}
