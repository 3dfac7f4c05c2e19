use crate::config::SizeConfig;
use crate::model::Node;

use super::NodeSize;

/// Rendered size of a table node.
///
/// Measured dimensions (`width`/`height`, then numeric `style` values) win per
/// axis. Anything missing is estimated from the header, one row per column and
/// the label length.
pub fn estimate_node_size(node: &Node, config: &SizeConfig) -> NodeSize {
    let width = node
        .width
        .or_else(|| node.style_dimension("width"))
        .filter(|w| w.is_finite() && *w > 0.0);
    let height = node
        .height
        .or_else(|| node.style_dimension("height"))
        .filter(|h| h.is_finite() && *h > 0.0);

    NodeSize {
        width: width.unwrap_or_else(|| estimated_width(node.label(), config)),
        height: height.unwrap_or_else(|| estimated_height(node.row_count(), config)),
    }
}

pub fn estimated_height(rows: usize, config: &SizeConfig) -> f32 {
    config.header_height + rows as f32 * config.row_height + config.padding
}

pub fn estimated_width(label: Option<&str>, config: &SizeConfig) -> f32 {
    let label = label.unwrap_or(&config.default_label);
    let chars = label.chars().count().min(config.max_label_chars);
    (config.base_width + config.char_width * chars as f32).max(config.min_width)
}

pub fn estimate_sizes(nodes: &[Node], config: &SizeConfig) -> Vec<NodeSize> {
    nodes
        .iter()
        .map(|node| estimate_node_size(node, config))
        .collect()
}
