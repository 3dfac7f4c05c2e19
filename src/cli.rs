use crate::api::{DiagramPatch, Endpoint, parse_diagram_document};
use crate::canvas::Canvas;
use crate::config::{ApiConfig, Config, load_config};
use crate::layout::Viewport;
use crate::model::{Diagram, Direction, NodeChange, XYPosition};
use crate::render::{render_svg, write_output_text};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::{Value, json};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "erdl", version, about = "Auto-layout and export for ERD canvas diagrams")]
pub struct Args {
    /// Diagram JSON file (bare resource or `{success, data}` envelope), or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout direction (LR or TB)
    #[arg(short = 'd', long = "direction", value_parser = parse_direction)]
    pub direction: Option<Direction>,

    /// Viewport width used for spacing density
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Viewport height used for spacing density
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Keep the positions from the input instead of running auto-layout
    #[arg(long = "keep-positions")]
    pub keep_positions: bool,

    /// Move a node after layout, e.g. `--drag users=640,120`; edges are re-oriented
    #[arg(long = "drag", value_parser = parse_drag)]
    pub drags: Vec<(String, XYPosition)>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
    /// Layout sync request for the backend: method, url and body
    Patch,
}

pub fn run() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let input = read_input(args.input.as_deref())?;
    let diagram = parse_diagram_document(&input).context("failed to parse diagram")?;
    info!(
        nodes = diagram.nodes.len(),
        edges = diagram.edges.len(),
        "loaded diagram"
    );

    let mut canvas = Canvas::from_diagram(&diagram, config.layout.clone());
    if !args.keep_positions {
        canvas.auto_layout(config.layout.direction);
    }
    for (id, position) in &args.drags {
        if canvas.node(id).is_none() {
            return Err(anyhow::anyhow!("Unknown node `{}` in --drag", id));
        }
        let flipped = canvas.apply_node_changes(&[NodeChange::Position {
            id: id.clone(),
            position: Some(*position),
            dragging: Some(false),
        }]);
        debug!(node = %id, ?flipped, "applied drag");
    }

    match args.output_format {
        OutputFormat::Json => {
            let json = canvas.to_diagram(&diagram).to_json_pretty()?;
            write_output_text(&json, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            let svg = snapshot_svg(&canvas, &config);
            write_output_text(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = snapshot_svg(&canvas, &config);
            write_png(&svg, &output, &config)?;
        }
        OutputFormat::Patch => {
            let request = sync_request(&canvas.to_diagram(&diagram), &config.api)?;
            let json = serde_json::to_string_pretty(&request)?;
            write_output_text(&json, args.output.as_deref())?;
        }
    }

    Ok(())
}

fn snapshot_svg(canvas: &Canvas, config: &Config) -> String {
    let nodes = canvas.nodes();
    let edges = canvas.edges();
    render_svg(
        &nodes,
        &edges[..],
        &config.theme,
        &config.layout.size,
        &config.render,
    )
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn sync_request(diagram: &Diagram, api: &ApiConfig) -> Result<Value> {
    let id = diagram
        .id
        .as_deref()
        .context("diagram has no `_id`, cannot build a sync request")?;
    let endpoint = Endpoint::UpdateDiagram(id.to_string());
    let url = endpoint.url(&api.base_url);
    info!(%url, "built layout sync request");
    Ok(json!({
        "method": endpoint.method().as_str(),
        "url": url,
        "body": DiagramPatch::layout(diagram),
    }))
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(direction) = args.direction {
        config.layout.direction = direction;
    }
    let fallback = config
        .layout
        .viewport
        .unwrap_or(config.layout.spacing.fallback_viewport);
    if args.width.is_some() || args.height.is_some() {
        config.layout.viewport = Some(Viewport {
            width: args.width.unwrap_or(fallback.width),
            height: args.height.unwrap_or(fallback.height),
        });
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    Direction::parse(raw).map_err(|err| err.to_string())
}

fn parse_drag(raw: &str) -> Result<(String, XYPosition), String> {
    let (id, coords) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NODE=X,Y, got `{raw}`"))?;
    let (x, y) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y coordinates, got `{coords}`"))?;
    let x: f32 = x.trim().parse().map_err(|_| format!("invalid x `{x}`"))?;
    let y: f32 = y.trim().parse().map_err(|_| format!("invalid y `{y}`"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err("node id must not be empty".to_string());
    }
    Ok((id.to_string(), XYPosition::new(x, y)))
}
