use crate::config::LayoutConfig;
use crate::layout::{Viewport, compute_layout};
use crate::model::{Diagram, Direction, Edge, Node, NodeChange, XYPosition};
use crate::orientation::resolve_orientation;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Owns the editor's node and edge snapshots.
///
/// Every mutation swaps in fresh snapshots; previously handed out snapshots
/// never change, and unchanged edges are shared between snapshots.
#[derive(Debug, Clone)]
pub struct Canvas {
    nodes: Arc<[Node]>,
    edges: Arc<[Arc<Edge>]>,
    config: LayoutConfig,
}

impl Canvas {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self::with_config(nodes, edges, LayoutConfig::default())
    }

    pub fn with_config(nodes: Vec<Node>, edges: Vec<Edge>, config: LayoutConfig) -> Self {
        Self {
            nodes: nodes.into(),
            edges: edges.into_iter().map(Arc::new).collect(),
            config,
        }
    }

    pub fn from_diagram(diagram: &Diagram, config: LayoutConfig) -> Self {
        Self::with_config(diagram.nodes.clone(), diagram.edges.clone(), config)
    }

    pub fn nodes(&self) -> Arc<[Node]> {
        Arc::clone(&self.nodes)
    }

    pub fn edges(&self) -> Arc<[Arc<Edge>]> {
        Arc::clone(&self.edges)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|edge| edge.id == id)
            .map(|edge| &**edge)
    }

    pub fn direction(&self) -> Direction {
        self.config.direction
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.config.viewport = viewport;
    }

    /// Re-runs the layered layout and remembers `direction` for later runs.
    pub fn auto_layout(&mut self, direction: Direction) {
        self.config.direction = direction;
        let laid_out = compute_layout(&self.nodes, &self.edges[..], direction, &self.config);
        debug!(nodes = laid_out.len(), direction = direction.as_str(), "auto layout applied");
        self.nodes = laid_out.into();
    }

    /// Applies a change batch and re-orients affected edges.
    ///
    /// Returns the ids of flipped edges. Removing a node also removes the
    /// edges attached to it.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> Vec<String> {
        if changes.is_empty() {
            return Vec::new();
        }
        let result = resolve_orientation(&self.nodes, &self.edges, changes, &self.config.size);

        let removed: HashSet<&str> = changes
            .iter()
            .filter_map(|change| match change {
                NodeChange::Remove { id } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        let edges: Arc<[Arc<Edge>]> = if removed.is_empty() {
            result.edges.into()
        } else {
            result
                .edges
                .into_iter()
                .filter(|edge| {
                    !removed.contains(edge.source.as_str())
                        && !removed.contains(edge.target.as_str())
                })
                .collect()
        };

        self.nodes = result.nodes.into();
        self.edges = edges;
        result.flipped
    }

    pub fn drag_node(&mut self, id: &str, position: XYPosition) -> Vec<String> {
        self.apply_node_changes(&[NodeChange::Position {
            id: id.to_string(),
            position: Some(position),
            dragging: Some(true),
        }])
    }

    pub fn replace_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges.into_iter().map(Arc::new).collect();
    }

    /// Copies the current snapshots into `base`, ready for the update call.
    pub fn to_diagram(&self, base: &Diagram) -> Diagram {
        Diagram {
            nodes: self.nodes.to_vec(),
            edges: self.edges.iter().map(|edge| Edge::clone(edge)).collect(),
            ..base.clone()
        }
    }
}
