//! Projected document graph
//!
//! A [`Graph`] is a read-only snapshot: built wholesale from a canonical
//! value by [`crate::to_graph`], never patched in place.

use crate::node::{Edge, EdgeId, Node, NodeId};
use serde::Serialize;
use std::collections::HashMap;

/// Node/edge projection of a document
///
/// # Invariants
/// - `nodes[0]` is the root; every other node has exactly one incoming edge
/// - nodes are in document pre-order
/// - `parent`, `children` and `incoming` index the same structure as `edges`
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,

    #[serde(skip)]
    index: HashMap<NodeId, usize>,
    #[serde(skip)]
    parent: Vec<Option<usize>>,
    #[serde(skip)]
    children: Vec<Vec<usize>>,
    #[serde(skip)]
    incoming: Vec<Option<usize>>,
    #[serde(skip)]
    limited_count: usize,
}

impl Graph {
    /// All nodes, root first
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of nodes (O(1))
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes that count against the size ceiling (empty containers excluded)
    #[inline]
    #[must_use]
    pub fn limited_count(&self) -> usize {
        self.limited_count
    }

    /// Check the size ceiling
    ///
    /// # Errors
    /// Returns [`OverflowError`] if [`Self::limited_count`] exceeds `limit`
    pub fn check_limit(&self, limit: usize) -> Result<(), OverflowError> {
        if self.limited_count > limit {
            return Err(OverflowError {
                node_count: self.limited_count,
                limit,
            });
        }
        Ok(())
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Check if node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Direct children of a node, in document order
    pub fn children(&self, id: &str) -> impl Iterator<Item = &Node> {
        self.index_of(id)
            .map(|i| self.children[i].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&c| &self.nodes[c])
    }

    /// Parent of a node
    #[must_use]
    pub fn parent(&self, id: &str) -> Option<&Node> {
        let idx = self.index_of(id)?;
        self.parent[idx].map(|p| &self.nodes[p])
    }

    /// Edge ending at a node
    #[must_use]
    pub fn incoming_edge(&self, id: &str) -> Option<&Edge> {
        let idx = self.index_of(id)?;
        self.incoming[idx].map(|e| &self.edges[e])
    }

    /// All nodes reachable from `id` by following edges (excluding `id`)
    #[must_use]
    pub fn descendants(&self, id: &str) -> Vec<&Node> {
        self.index_of(id)
            .map(|idx| {
                self.descendant_indices(idx)
                    .into_iter()
                    .map(|d| &self.nodes[d])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct children of the root
    pub fn top_level(&self) -> impl Iterator<Item = &Node> {
        self.children
            .first()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&c| &self.nodes[c])
    }

    /// Ids of nodes whose key, scalar text or child pairs contain `query`
    ///
    /// Case-insensitive; document order; an empty query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&NodeId> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.nodes
            .iter()
            .filter(|node| node_matches(node, &needle))
            .map(|node| &node.id)
            .collect()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub(crate) fn edge_into(&self, idx: usize) -> Option<&EdgeId> {
        self.incoming[idx].map(|e| &self.edges[e].id)
    }

    pub(crate) fn child_indices(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }

    pub(crate) fn ancestor_indices(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.parent[idx], move |&p| self.parent[p])
    }

    /// Transitive closure over outgoing edges, pre-order
    pub(crate) fn descendant_indices(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children[idx].iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children[next].iter().rev());
        }
        out
    }

    pub(crate) fn push_node(&mut self, node: Node, counts_against_limit: bool) -> usize {
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        self.parent.push(None);
        self.children.push(Vec::new());
        self.incoming.push(None);
        if counts_against_limit {
            self.limited_count += 1;
        }
        idx
    }

    pub(crate) fn link(&mut self, from: usize, to: usize) {
        let to_id = self.nodes[to].id.clone();
        self.edges.push(Edge {
            id: EdgeId::to_node(&to_id),
            from: self.nodes[from].id.clone(),
            to: to_id,
        });
        self.parent[to] = Some(from);
        self.children[from].push(to);
        self.incoming[to] = Some(self.edges.len() - 1);
    }
}

fn node_matches(node: &Node, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);
    if node.key().is_some_and(|key| contains(&key.to_string())) {
        return true;
    }
    match node.text.pairs() {
        Some(pairs) => pairs.iter().any(|(k, v)| contains(k) || contains(v)),
        None => node.text.as_scalar().is_some_and(|value| match value {
            serde_json::Value::String(s) => contains(s),
            other => contains(&other.to_string()),
        }),
    }
}

/// Graph exceeds the configured node ceiling
///
/// Not a correctness failure: the renderer shows an "above supported
/// limit" state instead of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("graph has {node_count} nodes, above the supported limit of {limit}")]
pub struct OverflowError {
    pub node_count: usize,
    pub limit: usize,
}
