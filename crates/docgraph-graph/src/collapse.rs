//! Collapse/expand set algebra
//!
//! Hidden state is three id sets over a [`Graph`]:
//!
//! - `collapsed_parents`: containers the user collapsed
//! - `collapsed_nodes`: every strict descendant of a collapsed parent
//! - `collapsed_edges`: every edge whose target is in `collapsed_nodes`
//!
//! The derived sets are always a pure function of `collapsed_parents` and
//! the graph, so overlapping collapses (a parent and one of its descendants)
//! compose: expanding the outer one keeps the inner subtree hidden.

use crate::graph::Graph;
use crate::node::{Edge, EdgeId, Node, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Result of a collapse or expand request
///
/// None of these is an error: stale ids from a previous graph are routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseOutcome {
    /// Subtree newly hidden
    Collapsed,
    /// Node was already collapsed (no-op)
    AlreadyCollapsed,
    /// Node removed from the collapsed parents
    Expanded,
    /// Node was not collapsed (no-op)
    AlreadyExpanded,
    /// Scalar or empty container (no-op)
    NotContainer,
    /// Id not in the graph (no-op)
    UnknownNode,
}

impl CollapseOutcome {
    /// Request addressed a collapsible node
    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        !matches!(self, Self::NotContainer | Self::UnknownNode)
    }

    /// Sets changed
    #[inline]
    #[must_use]
    pub fn changed(self) -> bool {
        matches!(self, Self::Collapsed | Self::Expanded)
    }
}

/// Collapse sets for one graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollapseState {
    collapsed_parents: BTreeSet<NodeId>,
    collapsed_nodes: BTreeSet<NodeId>,
    collapsed_edges: BTreeSet<EdgeId>,
}

impl CollapseState {
    /// Nothing collapsed
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapsed containers
    #[inline]
    #[must_use]
    pub fn collapsed_parents(&self) -> &BTreeSet<NodeId> {
        &self.collapsed_parents
    }

    /// Hidden nodes
    #[inline]
    #[must_use]
    pub fn collapsed_nodes(&self) -> &BTreeSet<NodeId> {
        &self.collapsed_nodes
    }

    /// Hidden edges
    #[inline]
    #[must_use]
    pub fn collapsed_edges(&self) -> &BTreeSet<EdgeId> {
        &self.collapsed_edges
    }

    /// Nothing collapsed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collapsed_parents.is_empty()
    }

    /// Hide the subtree below `id`
    pub fn collapse(&mut self, graph: &Graph, id: &str) -> CollapseOutcome {
        let Some(idx) = graph.index_of(id) else {
            return CollapseOutcome::UnknownNode;
        };
        let node = graph.node_at(idx);
        if !node.is_expandable() {
            return CollapseOutcome::NotContainer;
        }
        if !self.collapsed_parents.insert(node.id.clone()) {
            return CollapseOutcome::AlreadyCollapsed;
        }

        let hidden = self.hide_below(graph, idx);
        debug!(node = %node.id, hidden, "collapsed subtree");
        CollapseOutcome::Collapsed
    }

    /// Un-hide whatever below `id` is no longer covered by another collapse
    pub fn expand(&mut self, graph: &Graph, id: &str) -> CollapseOutcome {
        let Some(idx) = graph.index_of(id) else {
            return CollapseOutcome::UnknownNode;
        };
        if !self.collapsed_parents.remove(id) {
            return CollapseOutcome::AlreadyExpanded;
        }

        // A collapsed ancestor still covers the whole subtree
        let covered = graph
            .ancestor_indices(idx)
            .any(|a| self.collapsed_parents.contains(&graph.node_at(a).id));
        if covered {
            debug!(node = id, "expanded under a collapsed ancestor");
            return CollapseOutcome::Expanded;
        }

        let mut shown = 0usize;
        let mut stack: Vec<(usize, bool)> = graph
            .child_indices(idx)
            .iter()
            .rev()
            .map(|&c| (c, false))
            .collect();
        while let Some((child, covered)) = stack.pop() {
            let node = graph.node_at(child);
            if !covered {
                self.collapsed_nodes.remove(&node.id);
                if let Some(edge) = graph.edge_into(child) {
                    self.collapsed_edges.remove(edge);
                }
                shown += 1;
            }
            let covers_children = covered || self.collapsed_parents.contains(&node.id);
            stack.extend(
                graph
                    .child_indices(child)
                    .iter()
                    .rev()
                    .map(|&c| (c, covers_children)),
            );
        }

        debug!(node = id, shown, "expanded subtree");
        CollapseOutcome::Expanded
    }

    /// Collapse when expanded, expand when collapsed
    pub fn toggle(&mut self, graph: &Graph, id: &str) -> CollapseOutcome {
        if self.collapsed_parents.contains(id) {
            self.expand(graph, id)
        } else {
            self.collapse(graph, id)
        }
    }

    /// Collapse every non-empty top-level container
    ///
    /// When the root has no such children, the root itself is collapsed
    /// (if it is a non-empty container). Returns the first collapsed id,
    /// for viewport focus.
    pub fn collapse_all(&mut self, graph: &Graph) -> Option<NodeId> {
        let mut targets: Vec<&Node> = graph.top_level().filter(|n| n.is_expandable()).collect();
        if targets.is_empty() {
            targets.extend(graph.root().filter(|n| n.is_expandable()));
        }
        for node in &targets {
            self.collapse(graph, node.id.as_str());
        }
        debug!(collapsed = targets.len(), "collapsed all");
        targets.first().map(|n| n.id.clone())
    }

    /// Clear every set
    pub fn expand_all(&mut self) {
        self.collapsed_parents.clear();
        self.collapsed_nodes.clear();
        self.collapsed_edges.clear();
    }

    /// Carry state over to a rebuilt graph
    ///
    /// Keeps collapsed parents that are still non-empty containers and
    /// recomputes the derived sets against the new structure.
    pub fn retain(&mut self, graph: &Graph) {
        let before = self.collapsed_parents.len();
        self.collapsed_parents
            .retain(|id| graph.node(id.as_str()).is_some_and(Node::is_expandable));
        let dropped = before - self.collapsed_parents.len();
        if dropped > 0 {
            debug!(dropped, "dropped collapsed parents missing from rebuilt graph");
        }
        self.recompute(graph);
    }

    /// Rebuild the derived sets from `collapsed_parents`
    pub fn recompute(&mut self, graph: &Graph) {
        self.collapsed_nodes.clear();
        self.collapsed_edges.clear();
        let parents: Vec<usize> = self
            .collapsed_parents
            .iter()
            .filter_map(|id| graph.index_of(id.as_str()))
            .collect();
        for idx in parents {
            self.hide_below(graph, idx);
        }
    }

    /// Node is a collapsed parent
    #[inline]
    #[must_use]
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed_parents.contains(id)
    }

    /// Node is below some collapsed parent
    #[inline]
    #[must_use]
    pub fn is_node_hidden(&self, id: &str) -> bool {
        self.collapsed_nodes.contains(id)
    }

    /// Edge target is below some collapsed parent
    #[inline]
    #[must_use]
    pub fn is_edge_hidden(&self, id: &str) -> bool {
        self.collapsed_edges.contains(id)
    }

    /// Nodes to render
    pub fn visible_nodes<'a>(&'a self, graph: &'a Graph) -> impl Iterator<Item = &'a Node> + 'a {
        graph
            .nodes()
            .iter()
            .filter(move |n| !self.collapsed_nodes.contains(&n.id))
    }

    /// Edges to render
    pub fn visible_edges<'a>(&'a self, graph: &'a Graph) -> impl Iterator<Item = &'a Edge> + 'a {
        graph
            .edges()
            .iter()
            .filter(move |e| !self.collapsed_edges.contains(&e.id))
    }

    fn hide_below(&mut self, graph: &Graph, idx: usize) -> usize {
        let descendants = graph.descendant_indices(idx);
        for &d in &descendants {
            self.collapsed_nodes.insert(graph.node_at(d).id.clone());
            if let Some(edge) = graph.edge_into(d) {
                self.collapsed_edges.insert(edge.clone());
            }
        }
        descendants.len()
    }
}
