pub mod api;
pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod orientation;
pub mod render;
pub mod stream;
pub mod theme;

pub use canvas::Canvas;
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, SizeConfig, SpacingConfig, load_config};
pub use error::{ApiError, ConfigError, DiagramError, StreamError};
pub use layout::{Gaps, NodeSize, Viewport, compute_gaps, compute_layout, estimate_node_size};
pub use model::{Column, ColumnKey, Diagram, Direction, Edge, Node, NodeChange, XYPosition};
pub use orientation::{Reoriented, flip_edge, resolve_orientation};
pub use render::render_svg;
pub use theme::Theme;

use std::sync::Arc;

/// Lays out a diagram given as JSON and returns it as JSON.
///
/// `direction` falls back to the configured default when `None`.
pub fn layout_diagram_json(
    input: &str,
    direction: Option<&str>,
    config: &LayoutConfig,
) -> Result<String, DiagramError> {
    let diagram = api::parse_diagram_document(input)?;
    let direction = match direction {
        Some(token) => Direction::parse(token)?,
        None => config.direction,
    };
    let nodes = compute_layout(&diagram.nodes, &diagram.edges, direction, config);
    let laid_out = Diagram { nodes, ..diagram };
    laid_out.to_json_pretty()
}

/// Applies a JSON change batch to JSON nodes/edges and returns the
/// re-oriented `{ nodes, edges, flipped }` as JSON.
pub fn apply_changes_json(
    nodes_json: &str,
    edges_json: &str,
    changes_json: &str,
    config: &SizeConfig,
) -> Result<String, DiagramError> {
    let nodes: Vec<Node> = serde_json::from_str(nodes_json)?;
    let edges: Vec<Arc<Edge>> = serde_json::from_str(edges_json)?;
    let changes: Vec<NodeChange> = serde_json::from_str(changes_json)?;
    let result = resolve_orientation(&nodes, &edges, &changes, config);
    Ok(serde_json::to_string(&serde_json::json!({
        "nodes": result.nodes,
        "edges": result.edges,
        "flipped": result.flipped,
    }))?)
}
