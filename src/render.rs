use crate::config::{RenderConfig, SizeConfig};
use crate::layout::{NodeSize, estimate_node_size};
use crate::model::{Edge, HandlePosition, Node};
use crate::theme::Theme;
use anyhow::Result;
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

const HANDLE_SIDE_SUFFIXES: [(&str, HandlePosition); 2] = [
    ("-left", HandlePosition::Left),
    ("-right", HandlePosition::Right),
];

struct Placed<'a> {
    node: &'a Node,
    x: f32,
    y: f32,
    size: NodeSize,
}

/// Renders laid-out tables and their relationships as a standalone SVG.
pub fn render_svg<E: Borrow<Edge>>(
    nodes: &[Node],
    edges: &[E],
    theme: &Theme,
    size_config: &SizeConfig,
    render_config: &RenderConfig,
) -> String {
    let pad = render_config.padding;
    let sizes: Vec<NodeSize> = nodes
        .iter()
        .map(|node| estimate_node_size(node, size_config))
        .collect();

    let (min_x, min_y, max_x, max_y) = nodes.iter().zip(&sizes).fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), (node, size)| {
            (
                min_x.min(node.position.x),
                min_y.min(node.position.y),
                max_x.max(node.position.x + size.width),
                max_y.max(node.position.y + size.height),
            )
        },
    );
    let (offset_x, offset_y, width, height) = if nodes.is_empty() {
        (0.0, 0.0, 200.0, 200.0)
    } else {
        (
            pad - min_x,
            pad - min_y,
            (max_x - min_x + pad * 2.0).max(200.0),
            (max_y - min_y + pad * 2.0).max(200.0),
        )
    };

    let placed: HashMap<&str, Placed> = nodes
        .iter()
        .zip(&sizes)
        .map(|(node, size)| {
            (
                node.id.as_str(),
                Placed {
                    node,
                    x: node.position.x + offset_x,
                    y: node.position.y + offset_y,
                    size: *size,
                },
            )
        })
        .collect();

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        render_config.background
    ));

    let marker_names: BTreeSet<&str> = edges
        .iter()
        .flat_map(|edge| {
            let edge = edge.borrow();
            [edge.marker_start.as_deref(), edge.marker_end.as_deref()]
        })
        .flatten()
        .collect();
    svg.push_str("<defs>");
    for name in &marker_names {
        svg.push_str(&marker_def(name, theme));
    }
    svg.push_str("</defs>");

    for edge in edges {
        let edge = edge.borrow();
        let (Some(source), Some(target)) = (
            placed.get(edge.source.as_str()),
            placed.get(edge.target.as_str()),
        ) else {
            continue;
        };
        let start = anchor_point(source, edge.source_handle.as_deref(), true, size_config);
        let end = anchor_point(target, edge.target_handle.as_deref(), false, size_config);
        let mut attrs = String::new();
        if let Some(name) = edge.marker_start.as_deref() {
            attrs.push_str(&format!(" marker-start=\"url(#{})\"", marker_id(name)));
        }
        if let Some(name) = edge.marker_end.as_deref() {
            attrs.push_str(&format!(" marker-end=\"url(#{})\"", marker_id(name)));
        }
        svg.push_str(&format!(
            "<path data-edge=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"{attrs}/>",
            escape_xml(&edge.id),
            points_to_path(&elbow(start, end)),
            theme.line_color
        ));
    }

    for node in nodes {
        if let Some(placed) = placed.get(node.id.as_str()) {
            svg.push_str(&table_svg(placed, theme, size_config));
        }
    }

    svg.push_str("</svg>");
    svg
}

fn table_svg(placed: &Placed, theme: &Theme, config: &SizeConfig) -> String {
    let Placed { node, x, y, size } = placed;
    let (x, y) = (*x, *y);
    let mut out = String::new();
    out.push_str(&format!(
        "<g data-node=\"{}\"><rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
        escape_xml(&node.id),
        size.width,
        size.height,
        theme.body_fill,
        theme.border_color
    ));
    out.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
        size.width,
        config.header_height,
        theme.header_fill,
        theme.border_color
    ));
    let label = node.label().unwrap_or(&config.default_label);
    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"600\" fill=\"{}\">{}</text>",
        x + size.width / 2.0,
        y + config.header_height / 2.0 + theme.font_size * 0.35,
        theme.font_family,
        theme.font_size + 1.0,
        theme.header_text_color,
        escape_xml(label)
    ));

    for (idx, column) in node.columns().iter().enumerate() {
        let row_top = y + config.header_height + idx as f32 * config.row_height;
        if row_top + config.row_height > y + size.height {
            break;
        }
        let baseline = row_top + config.row_height / 2.0 + theme.font_size * 0.35;
        let mut text_x = x + 10.0;
        if let Some(key) = column.key {
            let color = match key {
                crate::model::ColumnKey::Primary => &theme.primary_key_color,
                crate::model::ColumnKey::Foreign => &theme.foreign_key_color,
            };
            out.push_str(&format!(
                "<text x=\"{text_x:.2}\" y=\"{baseline:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"700\" fill=\"{}\">{}</text>",
                theme.font_family,
                theme.font_size - 2.0,
                color,
                key.badge()
            ));
            text_x += 24.0;
        }
        out.push_str(&format!(
            "<text x=\"{text_x:.2}\" y=\"{baseline:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            theme.font_family,
            theme.font_size,
            theme.text_color,
            escape_xml(&column.title)
        ));
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{baseline:.2}\" text-anchor=\"end\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            x + size.width - 10.0,
            theme.font_family,
            theme.font_size - 1.0,
            theme.muted_text_color,
            escape_xml(&column.data_type)
        ));
    }
    out.push_str("</g>");
    out
}

/// Point where an edge attaches: the handle's column row when the handle
/// names one, otherwise the middle of the side the layout assigned.
fn anchor_point(
    placed: &Placed,
    handle: Option<&str>,
    outgoing: bool,
    config: &SizeConfig,
) -> (f32, f32) {
    let Placed { node, x, y, size } = placed;
    let (x, y) = (*x, *y);

    if let Some(handle) = handle {
        for (suffix, side) in HANDLE_SIDE_SUFFIXES {
            let Some(column_id) = handle.strip_suffix(suffix) else {
                continue;
            };
            let row = node.columns().iter().position(|column| column.id == column_id);
            let cy = match row {
                Some(row) => {
                    y + config.header_height
                        + row as f32 * config.row_height
                        + config.row_height / 2.0
                }
                None => y + size.height / 2.0,
            };
            let cx = if side == HandlePosition::Left { x } else { x + size.width };
            return (cx, cy);
        }
    }

    let side = if outgoing {
        node.source_position.unwrap_or(HandlePosition::Right)
    } else {
        node.target_position.unwrap_or(HandlePosition::Left)
    };
    match side {
        HandlePosition::Left => (x, y + size.height / 2.0),
        HandlePosition::Right => (x + size.width, y + size.height / 2.0),
        HandlePosition::Top => (x + size.width / 2.0, y),
        HandlePosition::Bottom => (x + size.width / 2.0, y + size.height),
    }
}

fn elbow(start: (f32, f32), end: (f32, f32)) -> Vec<(f32, f32)> {
    let mid_x = (start.0 + end.0) / 2.0;
    vec![start, (mid_x, start.1), (mid_x, end.1), end]
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

fn marker_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect();
    format!("erd-marker-{slug}")
}

/// Cardinality glyph drawn towards the table at the end of the path.
fn marker_def(name: &str, theme: &Theme) -> String {
    let kind = name
        .strip_suffix("-start")
        .or_else(|| name.strip_suffix("-end"))
        .unwrap_or(name);
    let stroke = &theme.line_color;
    let glyph = match kind {
        "one" | "one-to-one" => format!("<path d=\"M 14 2 L 14 14\" stroke=\"{stroke}\" stroke-width=\"1.4\"/>"),
        "many" | "one-to-many" => format!(
            "<path d=\"M 4 8 L 16 2 M 4 8 L 16 8 M 4 8 L 16 14\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1.4\"/>"
        ),
        "zero-to-one" => format!(
            "<circle cx=\"6\" cy=\"8\" r=\"3.5\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"1.2\"/><path d=\"M 14 2 L 14 14\" stroke=\"{stroke}\" stroke-width=\"1.4\"/>",
            theme.background
        ),
        "zero-to-many" => format!(
            "<circle cx=\"5\" cy=\"8\" r=\"3.5\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"1.2\"/><path d=\"M 9 8 L 18 2 M 9 8 L 18 8 M 9 8 L 18 14\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1.4\"/>",
            theme.background
        ),
        _ => format!("<path d=\"M 2 2 L 18 8 L 2 14 z\" fill=\"{stroke}\"/>"),
    };
    format!(
        "<marker id=\"{}\" viewBox=\"0 0 20 16\" refX=\"18\" refY=\"8\" markerWidth=\"20\" markerHeight=\"16\" markerUnits=\"userSpaceOnUse\" orient=\"auto-start-reverse\">{glyph}</marker>",
        marker_id(name)
    )
}

pub fn write_output_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let scale = render_cfg.scale.max(0.1);
    let size = tree.size().to_int_size();
    let width = (size.width() as f32 * scale).ceil() as u32;
    let height = (size.height() as f32 * scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;
    use crate::model::{Column, ColumnKey, Direction};

    fn diagram() -> (Vec<Node>, Vec<Edge>) {
        let users = Node::table(
            "users",
            "Users & Admins",
            vec![Column {
                id: "users_id".to_string(),
                title: "id".to_string(),
                data_type: "UUID".to_string(),
                key: Some(ColumnKey::Primary),
            }],
        );
        let posts = Node::table(
            "posts",
            "Posts",
            vec![
                Column {
                    id: "posts_id".to_string(),
                    title: "id".to_string(),
                    data_type: "UUID".to_string(),
                    key: Some(ColumnKey::Primary),
                },
                Column {
                    id: "posts_author".to_string(),
                    title: "author_id".to_string(),
                    data_type: "UUID".to_string(),
                    key: Some(ColumnKey::Foreign),
                },
            ],
        );
        let mut edge = Edge::new("users-posts", "users", "posts");
        edge.source_handle = Some("users_id-right".to_string());
        edge.target_handle = Some("posts_author-left".to_string());
        edge.marker_start = Some("one-start".to_string());
        edge.marker_end = Some("many-end".to_string());
        (vec![users, posts], vec![edge])
    }

    #[test]
    fn render_svg_basic() {
        let (nodes, edges) = diagram();
        let config = LayoutConfig::default();
        let laid_out = compute_layout(&nodes, &edges, Direction::LeftRight, &config);
        let svg = render_svg(
            &laid_out,
            &edges,
            &Theme::modern(),
            &config.size,
            &RenderConfig::default(),
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Users &amp; Admins"));
        assert!(svg.contains("author_id"));
        assert!(svg.contains("url(#erd-marker-one-start)"));
        assert!(svg.contains("<marker id=\"erd-marker-many-end\""));
        assert!(svg.contains("data-edge=\"users-posts\""));
    }

    #[test]
    fn handle_anchor_uses_column_row() {
        let (nodes, _) = diagram();
        let config = SizeConfig::default();
        let size = estimate_node_size(&nodes[1], &config);
        let placed = Placed {
            node: &nodes[1],
            x: 100.0,
            y: 50.0,
            size,
        };
        let (x, y) = anchor_point(&placed, Some("posts_author-left"), false, &config);
        assert_eq!(x, 100.0);
        assert_eq!(y, 50.0 + 36.0 + 24.0 + 12.0);
        let (x, _) = anchor_point(&placed, Some("unknown-right"), true, &config);
        assert_eq!(x, 100.0 + size.width);
    }

    #[test]
    fn empty_diagram_renders_blank_canvas() {
        let svg = render_svg::<Edge>(
            &[],
            &[],
            &Theme::classic(),
            &SizeConfig::default(),
            &RenderConfig::default(),
        );
        assert!(svg.contains("width=\"200.00\""));
    }
}
