//! Keeps relationship arrows pointing left to right while tables are dragged.

use crate::config::SizeConfig;
use crate::layout::estimate_node_size;
use crate::model::{Edge, Node, NodeChange, apply_node_changes};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static MARKER_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(start|end)$").unwrap());
static HANDLE_SIDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(left|right)$").unwrap());

#[derive(Debug, Clone)]
pub struct Reoriented {
    pub nodes: Vec<Node>,
    pub edges: Vec<Arc<Edge>>,
    /// Ids of the edges that were flipped, in flip order.
    pub flipped: Vec<String>,
}

/// `one-start` <-> `one-end`. Names without the suffix pass through.
pub fn flip_marker(name: &str) -> String {
    swap_suffix(&MARKER_SUFFIX_RE, name, "start", "end")
}

/// `col-left` <-> `col-right`. Ids without the suffix pass through.
pub fn flip_handle(id: &str) -> String {
    swap_suffix(&HANDLE_SIDE_RE, id, "left", "right")
}

fn swap_suffix(re: &Regex, value: &str, a: &str, b: &str) -> String {
    let Some(caps) = re.captures(value) else {
        debug!(value, "no -{a}/-{b} suffix, leaving unchanged");
        return value.to_string();
    };
    let (Some(whole), Some(side)) = (caps.get(0), caps.get(1)) else {
        return value.to_string();
    };
    let swapped = if side.as_str() == a { b } else { a };
    format!("{}-{}", &value[..whole.start()], swapped)
}

/// Reverses an edge: endpoints, handles and cardinality markers.
pub fn flip_edge(edge: &Edge) -> Edge {
    Edge {
        id: edge.id.clone(),
        source: edge.target.clone(),
        target: edge.source.clone(),
        source_handle: edge.target_handle.as_deref().map(flip_handle),
        target_handle: edge.source_handle.as_deref().map(flip_handle),
        marker_start: edge.marker_end.as_deref().map(flip_marker),
        marker_end: edge.marker_start.as_deref().map(flip_marker),
        kind: edge.kind.clone(),
        label: edge.label.clone(),
    }
}

fn center_x(node: &Node, config: &SizeConfig) -> f32 {
    node.position.x + estimate_node_size(node, config).width / 2.0
}

/// True when the source sits to the right of the target.
pub fn needs_flip(source: &Node, target: &Node, config: &SizeConfig) -> bool {
    center_x(source, config) > center_x(target, config)
}

/// Applies a change batch, then re-evaluates every edge incident to a moved
/// node. Edges that do not flip keep their `Arc` so callers can compare by
/// pointer; dangling edges are left alone.
pub fn resolve_orientation(
    nodes: &[Node],
    edges: &[Arc<Edge>],
    changes: &[NodeChange],
    config: &SizeConfig,
) -> Reoriented {
    let nodes = apply_node_changes(nodes, changes);
    let mut edges: Vec<Arc<Edge>> = edges.to_vec();
    let mut flipped = Vec::new();

    for change in changes {
        let NodeChange::Position { id, .. } = change else {
            continue;
        };
        if !nodes.iter().any(|node| &node.id == id) {
            continue;
        }
        for slot in edges.iter_mut() {
            if !slot.touches(id) {
                continue;
            }
            let source = nodes.iter().find(|node| node.id == slot.source);
            let target = nodes.iter().find(|node| node.id == slot.target);
            let (Some(source), Some(target)) = (source, target) else {
                continue;
            };
            if needs_flip(source, target, config) {
                let reversed = flip_edge(slot);
                debug!(
                    edge = %reversed.id,
                    source = %reversed.source,
                    target = %reversed.target,
                    "flipped edge"
                );
                flipped.push(reversed.id.clone());
                *slot = Arc::new(reversed);
            }
        }
    }

    Reoriented {
        nodes,
        edges,
        flipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::XYPosition;

    fn node_at(id: &str, x: f32) -> Node {
        let mut node = Node::table(id, id, Vec::new());
        node.position = XYPosition::new(x, 0.0);
        node.width = Some(200.0);
        node.height = Some(100.0);
        node
    }

    fn relationship() -> Edge {
        let mut edge = Edge::new("a-b", "a", "b");
        edge.source_handle = Some("a_id-right".to_string());
        edge.target_handle = Some("b_a_id-left".to_string());
        edge.marker_start = Some("one-start".to_string());
        edge.marker_end = Some("many-end".to_string());
        edge
    }

    #[test]
    fn marker_and_handle_suffixes_swap() {
        assert_eq!(flip_marker("one-start"), "one-end");
        assert_eq!(flip_marker("zero-to-one-end"), "zero-to-one-start");
        assert_eq!(flip_marker("start-of-many-end"), "start-of-many-start");
        assert_eq!(flip_marker("arrow"), "arrow");
        assert_eq!(flip_handle("users-id-left"), "users-id-right");
        assert_eq!(flip_handle("right-col-right"), "right-col-left");
        assert_eq!(flip_handle("plain"), "plain");
    }

    #[test]
    fn dragging_source_past_target_flips_edge() {
        let nodes = vec![node_at("a", 0.0), node_at("b", 350.0)];
        let edges = vec![Arc::new(relationship())];
        let result = resolve_orientation(
            &nodes,
            &edges,
            &[NodeChange::moved("a", 500.0, 0.0)],
            &SizeConfig::default(),
        );
        let edge = &result.edges[0];
        assert_eq!(edge.source, "b");
        assert_eq!(edge.target, "a");
        assert_eq!(edge.marker_start.as_deref(), Some("many-start"));
        assert_eq!(edge.marker_end.as_deref(), Some("one-end"));
        assert_eq!(edge.source_handle.as_deref(), Some("b_a_id-right"));
        assert_eq!(edge.target_handle.as_deref(), Some("a_id-left"));
        assert_eq!(result.flipped, vec!["a-b".to_string()]);
        assert_eq!(result.nodes[0].position.x, 500.0);
    }

    #[test]
    fn correctly_oriented_edges_keep_identity() {
        let nodes = vec![node_at("a", 0.0), node_at("b", 350.0), node_at("c", 700.0)];
        let edges = vec![
            Arc::new(relationship()),
            Arc::new(Edge::new("b-c", "b", "c")),
        ];
        let result = resolve_orientation(
            &nodes,
            &edges,
            &[NodeChange::moved("a", 20.0, 40.0)],
            &SizeConfig::default(),
        );
        assert!(result.flipped.is_empty());
        assert!(Arc::ptr_eq(&result.edges[0], &edges[0]));
        assert!(Arc::ptr_eq(&result.edges[1], &edges[1]));
    }

    #[test]
    fn only_flipped_edges_are_replaced() {
        let nodes = vec![node_at("a", 0.0), node_at("b", 350.0), node_at("c", 700.0)];
        let edges = vec![
            Arc::new(relationship()),
            Arc::new(Edge::new("b-c", "b", "c")),
        ];
        let result = resolve_orientation(
            &nodes,
            &edges,
            &[NodeChange::moved("a", 500.0, 0.0)],
            &SizeConfig::default(),
        );
        assert!(!Arc::ptr_eq(&result.edges[0], &edges[0]));
        assert!(Arc::ptr_eq(&result.edges[1], &edges[1]));
    }

    #[test]
    fn resolving_again_is_a_no_op() {
        let nodes = vec![node_at("a", 0.0), node_at("b", 350.0)];
        let edges = vec![Arc::new(relationship())];
        let config = SizeConfig::default();
        let changes = [NodeChange::moved("a", 500.0, 0.0)];
        let first = resolve_orientation(&nodes, &edges, &changes, &config);
        let second = resolve_orientation(&first.nodes, &first.edges, &changes, &config);
        assert!(second.flipped.is_empty());
        assert!(Arc::ptr_eq(&second.edges[0], &first.edges[0]));
    }

    #[test]
    fn flipping_back_restores_original_edge() {
        let nodes = vec![node_at("a", 0.0), node_at("b", 350.0)];
        let original = relationship();
        let edges = vec![Arc::new(original.clone())];
        let config = SizeConfig::default();
        let away = resolve_orientation(
            &nodes,
            &edges,
            &[NodeChange::moved("a", 500.0, 0.0)],
            &config,
        );
        let back = resolve_orientation(
            &away.nodes,
            &away.edges,
            &[NodeChange::moved("b", 900.0, 0.0)],
            &config,
        );
        assert_eq!(*back.edges[0], original);
        assert_eq!(flip_edge(&flip_edge(&original)), original);
    }

    #[test]
    fn dangling_edges_are_skipped() {
        let nodes = vec![node_at("a", 900.0)];
        let edges = vec![Arc::new(Edge::new("ghost", "a", "missing"))];
        let result = resolve_orientation(
            &nodes,
            &edges,
            &[NodeChange::moved("a", 1000.0, 0.0)],
            &SizeConfig::default(),
        );
        assert!(result.flipped.is_empty());
        assert!(Arc::ptr_eq(&result.edges[0], &edges[0]));
    }

    #[test]
    fn non_position_changes_do_not_reorient() {
        let nodes = vec![node_at("a", 500.0), node_at("b", 0.0)];
        let edges = vec![Arc::new(relationship())];
        let result = resolve_orientation(
            &nodes,
            &edges,
            &[NodeChange::Select {
                id: "a".to_string(),
                selected: true,
            }],
            &SizeConfig::default(),
        );
        assert!(result.flipped.is_empty());
        assert!(result.nodes[0].selected);
    }

    #[test]
    fn centers_use_estimated_width_when_unmeasured() {
        let mut wide = Node::table("wide", &"W".repeat(28), Vec::new());
        wide.position = XYPosition::new(0.0, 0.0);
        let mut narrow = Node::table("narrow", "N", Vec::new());
        narrow.position = XYPosition::new(30.0, 0.0);
        // wide center 216, narrow center 140
        assert!(needs_flip(&wide, &narrow, &SizeConfig::default()));
    }
}
