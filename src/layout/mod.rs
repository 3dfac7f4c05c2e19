mod size;
mod spacing;

pub use size::{estimate_node_size, estimate_sizes, estimated_height, estimated_width};
pub use spacing::compute_gaps;

use crate::config::LayoutConfig;
use crate::model::{Direction, Edge, Node, XYPosition};
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use tracing::debug;

const RANKER: &str = "tight-tree";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Separation parameters handed to the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gaps {
    pub node_sep: f32,
    pub rank_sep: f32,
    pub edge_sep: f32,
    pub margin_x: f32,
    pub margin_y: f32,
}

/// Lays the tables out with dagre and returns a new node list.
///
/// Every returned node has a top-left `position`, handle sides matching
/// `direction` and is draggable. Nodes dagre does not report stay at the
/// origin. Input order is preserved.
pub fn compute_layout<E: Borrow<Edge>>(
    nodes: &[Node],
    edges: &[E],
    direction: Direction,
    config: &LayoutConfig,
) -> Vec<Node> {
    let (source_position, target_position) = direction.handle_positions();
    let sizes = estimate_sizes(nodes, &config.size);
    let centers = if nodes.is_empty() {
        Vec::new()
    } else {
        let gaps = compute_gaps(nodes, direction, config);
        run_dagre(nodes, &sizes, edges, direction, gaps)
    };

    nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let size = sizes[idx];
            let position = match centers.get(idx).copied().flatten() {
                Some((cx, cy)) => XYPosition::new(cx - size.width / 2.0, cy - size.height / 2.0),
                None => {
                    debug!(node = %node.id, "layout did not place node, using origin");
                    XYPosition::default()
                }
            };
            let mut laid_out = node.clone();
            laid_out.position = position;
            laid_out.source_position = Some(source_position);
            laid_out.target_position = Some(target_position);
            laid_out.draggable = true;
            laid_out
        })
        .collect()
}

fn run_dagre<E: Borrow<Edge>>(
    nodes: &[Node],
    sizes: &[NodeSize],
    edges: &[E],
    direction: Direction,
    gaps: Gaps,
) -> Vec<Option<(f32, f32)>> {
    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(direction).to_string());
    // network-simplex, the dagre default, does not terminate on some DAGs.
    graph_config.ranker = Some(RANKER.to_string());
    graph_config.nodesep = Some(gaps.node_sep);
    graph_config.ranksep = Some(gaps.rank_sep);
    graph_config.edgesep = Some(gaps.edge_sep);
    graph_config.marginx = Some(gaps.margin_x);
    graph_config.marginy = Some(gaps.margin_y);
    dagre_graph.set_graph(graph_config);

    let node_ids: Vec<String> = nodes.iter().map(|node| node.id.clone()).collect();
    for (node_id, size) in node_ids.iter().zip(sizes) {
        let mut node = DagreNode::default();
        node.width = size.width;
        node.height = size.height;
        dagre_graph.set_node(node_id.clone(), Some(node));
    }

    let node_set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    let mut edge_set: HashSet<(String, String)> = HashSet::new();
    for edge in edges {
        let edge = edge.borrow();
        if edge.source == edge.target {
            continue;
        }
        if !node_set.contains(edge.source.as_str()) || !node_set.contains(edge.target.as_str()) {
            debug!(edge = %edge.id, "skipping dangling edge in layout");
            continue;
        }
        let from = edge.source.clone();
        let to = edge.target.clone();
        if !edge_set.insert((from.clone(), to.clone())) {
            continue;
        }
        let edge_label = DagreEdge::default();
        let _ = dagre_graph.set_edge(&from, &to, Some(edge_label), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    node_ids
        .iter()
        .map(|node_id| dagre_graph.node(node_id).and_then(placed_center))
        .collect()
}

/// Center of a node dagre actually ranked; registered-but-skipped nodes keep
/// their default label and have no rank.
fn placed_center(placed: &DagreNode) -> Option<(f32, f32)> {
    if placed.rank.is_none() || !placed.x.is_finite() || !placed.y.is_finite() {
        return None;
    }
    Some((placed.x, placed.y))
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::LeftRight => "lr",
        Direction::TopBottom => "tb",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKey, HandlePosition};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn table(id: &str, label: &str, rows: usize) -> Node {
        let schema = (0..rows)
            .map(|idx| Column {
                id: format!("{id}_{idx}"),
                title: format!("field_{idx}"),
                data_type: "INT".to_string(),
                key: (idx == 0).then_some(ColumnKey::Primary),
            })
            .collect();
        Node::table(id, label, schema)
    }

    fn overlaps(a: &Node, b: &Node, config: &LayoutConfig) -> bool {
        let sa = estimate_node_size(a, &config.size);
        let sb = estimate_node_size(b, &config.size);
        a.position.x < b.position.x + sb.width
            && b.position.x < a.position.x + sa.width
            && a.position.y < b.position.y + sb.height
            && b.position.y < a.position.y + sa.height
    }

    fn sample() -> (Vec<Node>, Vec<Edge>) {
        let nodes = vec![
            table("users", "Users", 4),
            table("orders", "Orders", 6),
            table("items", "OrderItems", 5),
            table("products", "Products", 3),
        ];
        let edges = vec![
            Edge::new("e1", "users", "orders"),
            Edge::new("e2", "orders", "items"),
            Edge::new("e3", "products", "items"),
        ];
        (nodes, edges)
    }

    #[test]
    fn left_right_layout_orders_ranks_horizontally() {
        let (nodes, edges) = sample();
        let config = LayoutConfig::default();
        let laid_out = compute_layout(&nodes, &edges, Direction::LeftRight, &config);
        assert_eq!(laid_out.len(), nodes.len());
        let users = &laid_out[0];
        let orders = &laid_out[1];
        let items = &laid_out[2];
        assert!(orders.position.x > users.position.x);
        assert!(items.position.x > orders.position.x);
        for node in &laid_out {
            assert!(node.draggable);
            assert_eq!(node.source_position, Some(HandlePosition::Right));
            assert_eq!(node.target_position, Some(HandlePosition::Left));
        }
    }

    #[test]
    fn top_bottom_layout_orders_ranks_vertically() {
        let (nodes, edges) = sample();
        let config = LayoutConfig::default();
        let laid_out = compute_layout(&nodes, &edges, Direction::TopBottom, &config);
        assert!(laid_out[1].position.y > laid_out[0].position.y);
        assert_eq!(laid_out[0].source_position, Some(HandlePosition::Bottom));
        assert_eq!(laid_out[0].target_position, Some(HandlePosition::Top));
    }

    #[test]
    fn laid_out_nodes_do_not_overlap() {
        let (nodes, edges) = sample();
        let config = LayoutConfig::default();
        let laid_out = compute_layout(&nodes, &edges, Direction::LeftRight, &config);
        for (i, a) in laid_out.iter().enumerate() {
            for b in laid_out.iter().skip(i + 1) {
                assert!(!overlaps(a, b, &config), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn layout_is_deterministic() {
        let (nodes, edges) = sample();
        let config = LayoutConfig::default();
        let first = compute_layout(&nodes, &edges, Direction::LeftRight, &config);
        let second = compute_layout(&nodes, &edges, Direction::LeftRight, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn dangling_self_and_parallel_edges_are_tolerated() {
        let (nodes, mut edges) = sample();
        edges.push(Edge::new("self", "users", "users"));
        edges.push(Edge::new("dup", "users", "orders"));
        edges.push(Edge::new("ghost", "users", "missing"));
        let config = LayoutConfig::default();
        let laid_out = compute_layout(&nodes, &edges, Direction::LeftRight, &config);
        assert_eq!(laid_out.len(), 4);
        assert!(laid_out.iter().all(|n| n.position.x.is_finite() && n.position.y.is_finite()));
    }

    #[test]
    fn unranked_dagre_nodes_are_not_placed() {
        assert_eq!(placed_center(&DagreNode::default()), None);
        let mut ranked = DagreNode::default();
        ranked.rank = Some(0);
        ranked.x = 120.0;
        ranked.y = 48.0;
        assert_eq!(placed_center(&ranked), Some((120.0, 48.0)));
        ranked.x = f32::NAN;
        assert_eq!(placed_center(&ranked), None);
    }

    fn layout_within_deadline(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        direction: Direction,
    ) -> Vec<Node> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let laid_out = compute_layout(&nodes, &edges, direction, &LayoutConfig::default());
            let _ = tx.send(laid_out);
        });
        rx.recv_timeout(Duration::from_secs(10))
            .expect("layout did not finish within 10s")
    }

    #[test]
    fn multi_parent_schema_finishes() {
        let nodes: Vec<Node> = (0..8)
            .map(|idx| table(&format!("t{idx}"), &format!("Table{idx}"), 1 + idx % 4))
            .collect();
        let pairs = [
            (1, 5),
            (5, 7),
            (5, 3),
            (3, 7),
            (1, 3),
            (2, 4),
            (3, 6),
            (4, 0),
            (4, 6),
        ];
        let edges: Vec<Edge> = pairs
            .iter()
            .map(|(from, to)| {
                Edge::new(
                    &format!("t{from}-t{to}"),
                    &format!("t{from}"),
                    &format!("t{to}"),
                )
            })
            .collect();
        for direction in [Direction::LeftRight, Direction::TopBottom] {
            let laid_out = layout_within_deadline(nodes.clone(), edges.clone(), direction);
            assert_eq!(laid_out.len(), 8);
            let config = LayoutConfig::default();
            for (i, a) in laid_out.iter().enumerate() {
                for b in laid_out.iter().skip(i + 1) {
                    assert!(!overlaps(a, b, &config), "{} overlaps {}", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn cyclic_and_denser_schemas_finish() {
        let nodes: Vec<Node> = (0..30)
            .map(|idx| table(&format!("t{idx}"), &format!("Table{idx}"), 1 + idx % 7))
            .collect();
        let mut edges = Vec::new();
        for idx in 0..30usize {
            for step in [1usize, 3, 7] {
                let to = (idx * 5 + step) % 30;
                if to != idx {
                    edges.push(Edge::new(
                        &format!("e{idx}-{to}"),
                        &format!("t{idx}"),
                        &format!("t{to}"),
                    ));
                }
            }
        }
        edges.push(Edge::new("back", "t29", "t0"));
        let laid_out = layout_within_deadline(nodes, edges, Direction::LeftRight);
        assert_eq!(laid_out.len(), 30);
        assert!(
            laid_out
                .iter()
                .all(|n| n.position.x.is_finite() && n.position.y.is_finite())
        );
    }

    #[test]
    fn empty_graph_yields_empty_layout() {
        let config = LayoutConfig::default();
        let laid_out = compute_layout::<Edge>(&[], &[], Direction::LeftRight, &config);
        assert!(laid_out.is_empty());
    }

    #[test]
    fn input_nodes_are_not_mutated() {
        let (nodes, edges) = sample();
        let before = nodes.clone();
        let _ = compute_layout(&nodes, &edges, Direction::TopBottom, &LayoutConfig::default());
        assert_eq!(nodes, before);
    }
}
