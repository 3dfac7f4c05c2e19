use crate::error::ConfigError;
use crate::layout::Viewport;
use crate::model::Direction;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const API_BASE_URL_ENV: &str = "ERDL_API_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SizeConfig {
    pub header_height: f32,
    pub row_height: f32,
    pub padding: f32,
    pub min_width: f32,
    pub base_width: f32,
    pub char_width: f32,
    pub max_label_chars: usize,
    pub default_label: String,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            header_height: 36.0,
            row_height: 24.0,
            padding: 12.0,
            min_width: 220.0,
            base_width: 180.0,
            char_width: 9.0,
            max_label_chars: 28,
            default_label: "Table".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }
}

/// Weights of the average and largest node extent in the base separations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeparationWeights {
    pub node_sep_avg: f32,
    pub node_sep_max: f32,
    pub rank_sep_avg: f32,
    pub rank_sep_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpacingConfig {
    pub fallback_width: f32,
    pub fallback_height: f32,
    pub fallback_viewport: Viewport,
    pub capacity_factor: f32,
    pub density: Bounds,
    pub density_exponent: f32,
    pub left_right: SeparationWeights,
    pub top_bottom: SeparationWeights,
    pub node_sep: Bounds,
    pub rank_sep: Bounds,
    pub edge_sep_ratio: f32,
    pub edge_sep: Bounds,
    pub margin_ratio: f32,
    pub margin: Bounds,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            fallback_width: 260.0,
            fallback_height: 120.0,
            fallback_viewport: Viewport {
                width: 1280.0,
                height: 800.0,
            },
            capacity_factor: 2.0,
            density: Bounds::new(0.5, 2.0),
            density_exponent: 0.6,
            left_right: SeparationWeights {
                node_sep_avg: 0.22,
                node_sep_max: 0.04,
                rank_sep_avg: 0.5,
                rank_sep_max: 0.06,
            },
            top_bottom: SeparationWeights {
                node_sep_avg: 0.18,
                node_sep_max: 0.04,
                rank_sep_avg: 0.65,
                rank_sep_max: 0.06,
            },
            node_sep: Bounds::new(12.0, 320.0),
            rank_sep: Bounds::new(16.0, 420.0),
            edge_sep_ratio: 0.03,
            edge_sep: Bounds::new(8.0, 40.0),
            margin_ratio: 0.12,
            margin: Bounds::new(8.0, 24.0),
        }
    }
}

impl SpacingConfig {
    pub fn weights(&self, direction: Direction) -> SeparationWeights {
        match direction {
            Direction::LeftRight => self.left_right,
            Direction::TopBottom => self.top_bottom,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub direction: Direction,
    /// Canvas viewport; `None` falls back to `spacing.fallback_viewport`.
    pub viewport: Option<Viewport>,
    pub size: SizeConfig,
    pub spacing: SpacingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub padding: f32,
    pub background: String,
    /// Scale applied when rasterizing to PNG.
    pub scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            padding: 24.0,
            background: "#FFFFFF".to_string(),
            scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
            api: ApiConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    header_fill: Option<String>,
    header_text_color: Option<String>,
    body_fill: Option<String>,
    text_color: Option<String>,
    border_color: Option<String>,
    line_color: Option<String>,
    primary_key_color: Option<String>,
    foreign_key_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    render: Option<RenderConfig>,
    api: Option<ApiConfig>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    if let Some(path) = path {
        let contents = std::fs::read_to_string(path)?;
        let parsed: ConfigFile = serde_json::from_str(&contents)?;
        apply_config_file(&mut config, parsed);
        debug!(path = %path.display(), "loaded config file");
    }
    apply_env(&mut config, std::env::var(API_BASE_URL_ENV).ok());
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.header_fill {
            config.theme.header_fill = v;
        }
        if let Some(v) = vars.header_text_color {
            config.theme.header_text_color = v;
        }
        if let Some(v) = vars.body_fill {
            config.theme.body_fill = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.border_color {
            config.theme.border_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.primary_key_color {
            config.theme.primary_key_color = v;
        }
        if let Some(v) = vars.foreign_key_color {
            config.theme.foreign_key_color = v;
        }
        if let Some(v) = vars.background {
            config.render.background = v.clone();
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    if let Some(api) = parsed.api {
        config.api = api;
    }
}

fn apply_env(config: &mut Config, base_url: Option<String>) {
    match base_url {
        Some(url) if !url.trim().is_empty() => {
            info!("{API_BASE_URL_ENV} set, using {url}");
            config.api.base_url = url.trim().to_string();
        }
        _ => debug!("{API_BASE_URL_ENV} not set, using {}", config.api.base_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_layout_section_keeps_defaults() {
        let config = parse_config(
            r#"{
                "theme": "modern",
                "layout": {
                    "direction": "TB",
                    "viewport": {"width": 1920, "height": 1080},
                    "spacing": {"nodeSep": {"min": 20, "max": 200}}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.layout.direction, Direction::TopBottom);
        assert_eq!(
            config.layout.viewport,
            Some(Viewport {
                width: 1920.0,
                height: 1080.0
            })
        );
        assert_eq!(config.layout.spacing.node_sep, Bounds::new(20.0, 200.0));
        assert_eq!(config.layout.spacing.rank_sep, Bounds::new(16.0, 420.0));
        assert_eq!(config.layout.size.row_height, 24.0);
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
    }

    #[test]
    fn theme_variables_override_theme() {
        let config = parse_config(
            r##"{"themeVariables": {"lineColor": "#123456", "background": "#000000"}}"##,
        )
        .unwrap();
        assert_eq!(config.theme.line_color, "#123456");
        assert_eq!(config.render.background, "#000000");
    }

    #[test]
    fn env_base_url_overrides_default() {
        let mut config = Config::default();
        apply_env(&mut config, Some(" https://api.example.test ".to_string()));
        assert_eq!(config.api.base_url, "https://api.example.test");
        apply_env(&mut config, Some(String::new()));
        assert_eq!(config.api.base_url, "https://api.example.test");
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(parse_config("{"), Err(ConfigError::Json(_))));
    }
}
