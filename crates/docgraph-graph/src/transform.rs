//! Canonical value to graph projection

use crate::graph::Graph;
use crate::node::{Node, NodeData, NodeId, NodeText, ValueKind};
use docgraph_document::{DocPath, Segment};
use serde_json::Value;

/// Project a canonical value into a node/edge graph
///
/// Always completes, whatever the size; callers apply the ceiling through
/// [`Graph::check_limit`]. Nodes come out in pre-order document order.
#[must_use]
pub fn to_graph(value: &Value) -> Graph {
    let mut graph = Graph::default();
    let mut stack: Vec<(&Value, DocPath, Option<usize>)> =
        vec![(value, DocPath::root_of(value), None)];

    while let Some((value, path, parent)) = stack.pop() {
        let children = child_entries(value);
        let kind = ValueKind::of(value);
        let is_empty = kind.is_container() && children.is_empty();

        let node = Node {
            id: NodeId::from_path(&path),
            text: node_text(value, &children),
            data: NodeData {
                kind,
                is_parent: kind.is_container(),
                children_count: children.len(),
                is_empty,
            },
            path,
        };
        let child_path_base = node.path.clone();
        let idx = graph.push_node(node, !is_empty);
        if let Some(parent) = parent {
            graph.link(parent, idx);
        }

        // Reversed so the first child is popped first
        for (segment, child) in children.into_iter().rev() {
            stack.push((child, child_path_base.child(segment), Some(idx)));
        }
    }

    graph
}

fn child_entries(value: &Value) -> Vec<(Segment, &Value)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, child)| (Segment::key(key.as_str()), child))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, child)| (Segment::Index(index), child))
            .collect(),
        _ => Vec::new(),
    }
}

fn node_text(value: &Value, children: &[(Segment, &Value)]) -> NodeText {
    if !value.is_object() && !value.is_array() {
        return NodeText::Scalar(value.clone());
    }
    NodeText::Container(
        children
            .iter()
            .map(|(segment, child)| (segment.to_string(), summary(child)))
            .collect(),
    )
}

/// One-line label for a child inside its container's text
#[must_use]
pub fn summary(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.len() {
            1 => "{1 key}".to_string(),
            n => format!("{{{n} keys}}"),
        },
        Value::Array(items) => match items.len() {
            1 => "[1 item]".to_string(),
            n => format!("[{n} items]"),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.nodes().iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn transform_scalar_document() {
        let graph = to_graph(&json!(42));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        let root = graph.root().unwrap();
        assert_eq!(root.id.as_str(), "{Root}");
        assert_eq!(root.text, NodeText::Scalar(json!(42)));
        assert!(!root.data.is_parent);
    }

    #[test]
    fn transform_object_pre_order() {
        let graph = to_graph(&json!({
            "fruit": {"name": "Apple", "tags": ["red", "sweet"]},
            "count": 3
        }));
        assert_eq!(
            ids(&graph),
            vec![
                "{Root}",
                "{Root}.fruit",
                "{Root}.fruit.name",
                "{Root}.fruit.tags",
                "{Root}.fruit.tags[0]",
                "{Root}.fruit.tags[1]",
                "{Root}.count",
            ]
        );
        assert_eq!(graph.edge_count(), graph.node_count() - 1);
    }

    #[test]
    fn transform_array_root_token() {
        let graph = to_graph(&json!([{"id": 1}, 2]));
        assert_eq!(ids(&graph), vec!["Root", "Root[0]", "Root[0].id", "Root[1]"]);
    }

    #[test]
    fn transform_container_text_pairs() {
        let graph = to_graph(&json!({
            "s": "text",
            "n": 1.5,
            "b": false,
            "z": null,
            "o": {"k": 1},
            "oo": {"a": 1, "b": 2},
            "a": [1],
            "aa": []
        }));
        let root = graph.root().unwrap();
        let pairs: Vec<(&str, &str)> = root
            .text
            .pairs()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("s", "text"),
                ("n", "1.5"),
                ("b", "false"),
                ("z", "null"),
                ("o", "{1 key}"),
                ("oo", "{2 keys}"),
                ("a", "[1 item]"),
                ("aa", "[0 items]"),
            ]
        );
    }

    #[test]
    fn transform_array_pairs_use_indices() {
        let graph = to_graph(&json!({"list": ["x", "y"]}));
        let list = graph.node("{Root}.list").unwrap();
        assert_eq!(
            list.text,
            NodeText::Container(vec![("0".into(), "x".into()), ("1".into(), "y".into())])
        );
        assert_eq!(list.data.kind, ValueKind::Array);
        assert_eq!(list.data.children_count, 2);
    }

    #[test]
    fn transform_empty_containers() {
        let graph = to_graph(&json!({"e": {}, "l": [], "v": 1}));
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.limited_count(), 2);

        let empty = graph.node("{Root}.e").unwrap();
        assert!(empty.data.is_empty);
        assert!(empty.data.is_parent);
        assert!(!empty.is_expandable());
        assert_eq!(graph.children("{Root}.e").count(), 0);
    }

    #[test]
    fn transform_edges_link_parent_to_child() {
        let graph = to_graph(&json!({"a": {"b": 1}}));
        let edge = graph.incoming_edge("{Root}.a.b").unwrap();
        assert_eq!(edge.from.as_str(), "{Root}.a");
        assert_eq!(edge.to.as_str(), "{Root}.a.b");
        assert_eq!(edge.id.as_str(), "edge:{Root}.a.b");
        assert!(graph.incoming_edge("{Root}").is_none());
        assert_eq!(graph.parent("{Root}.a.b").unwrap().id.as_str(), "{Root}.a");
    }

    #[test]
    fn transform_deep_nesting_does_not_recurse() {
        let mut value = json!(0);
        for _ in 0..2_000 {
            value = json!([value]);
        }
        let graph = to_graph(&value);
        assert_eq!(graph.node_count(), 2_001);
        assert_eq!(graph.nodes().last().unwrap().path.len(), 2_000);
    }

    #[test]
    fn transform_limit_check() {
        let graph = to_graph(&json!({"a": [1, 2, 3], "e": []}));
        assert_eq!(graph.limited_count(), 5);
        assert!(graph.check_limit(5).is_ok());
        let err = graph.check_limit(4).unwrap_err();
        assert_eq!(err.node_count, 5);
        assert_eq!(err.limit, 4);
    }

    #[test]
    fn transform_search() {
        let graph = to_graph(&json!({"fruit": {"name": "Apple"}, "car": {"make": "Audi"}}));
        let hits: Vec<&str> = graph.search("apple").iter().map(|id| id.as_str()).collect();
        assert_eq!(hits, vec!["{Root}.fruit", "{Root}.fruit.name"]);

        let hits: Vec<&str> = graph.search("CAR").iter().map(|id| id.as_str()).collect();
        assert_eq!(hits, vec!["{Root}", "{Root}.car"]);

        assert!(graph.search("   ").is_empty());
    }
}
