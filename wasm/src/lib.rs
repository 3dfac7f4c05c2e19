use erd_canvas_layout::{
    Config, Direction, LayoutConfig, Theme, Viewport, apply_changes_json, layout_diagram_json,
    render_svg,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasOptions {
    direction: Option<String>,
    viewport_width: Option<f32>,
    viewport_height: Option<f32>,
    theme: Option<String>,
    font_family: Option<String>,
}

fn parse_options(options_json: Option<String>) -> Result<CanvasOptions, JsValue> {
    match options_json {
        Some(raw) => serde_json::from_str::<CanvasOptions>(&raw)
            .map_err(|error| JsValue::from_str(&error.to_string())),
        None => Ok(CanvasOptions::default()),
    }
}

fn build_layout_config(options: &CanvasOptions) -> Result<LayoutConfig, JsValue> {
    let mut config = LayoutConfig::default();
    if let Some(direction) = options.direction.as_deref() {
        config.direction =
            Direction::parse(direction).map_err(|error| JsValue::from_str(&error.to_string()))?;
    }
    if let (Some(width), Some(height)) = (options.viewport_width, options.viewport_height) {
        config.viewport = Some(Viewport { width, height });
    }
    Ok(config)
}

/// Auto-layout for the canvas: diagram JSON in, diagram JSON out.
#[wasm_bindgen]
pub fn layout_diagram(diagram_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json)?;
    let config = build_layout_config(&options)?;
    layout_diagram_json(diagram_json, None, &config)
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Drag handler: applies node changes and re-orients edges.
#[wasm_bindgen]
pub fn apply_node_changes(
    nodes_json: &str,
    edges_json: &str,
    changes_json: &str,
) -> Result<String, JsValue> {
    let config = LayoutConfig::default();
    apply_changes_json(nodes_json, edges_json, changes_json, &config.size)
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

/// SVG snapshot of an already laid-out diagram, for image export.
#[wasm_bindgen]
pub fn render_diagram_svg(
    diagram_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = parse_options(options_json)?;
    let diagram = erd_canvas_layout::api::parse_diagram_document(diagram_json)
        .map_err(|error| JsValue::from_str(&error.to_string()))?;
    let mut config = Config::default();
    if options.theme.as_deref() == Some("modern") {
        config.theme = Theme::modern();
    }
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    Ok(render_svg(
        &diagram.nodes,
        &diagram.edges,
        &config.theme,
        &config.layout.size,
        &config.render,
    ))
}
