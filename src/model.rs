use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::DiagramError;

/// Layered layout direction of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "TB", alias = "TD")]
    TopBottom,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim() {
            "LR" | "lr" => Some(Self::LeftRight),
            "TB" | "TD" | "tb" | "td" => Some(Self::TopBottom),
            _ => None,
        }
    }

    pub fn parse(token: &str) -> Result<Self, DiagramError> {
        Self::from_token(token).ok_or_else(|| DiagramError::UnknownDirection(token.to_string()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeftRight => "LR",
            Self::TopBottom => "TB",
        }
    }

    /// Sides an edge leaves from and enters at for nodes laid out in this direction.
    pub fn handle_positions(self) -> (HandlePosition, HandlePosition) {
        match self {
            Self::LeftRight => (HandlePosition::Right, HandlePosition::Left),
            Self::TopBottom => (HandlePosition::Bottom, HandlePosition::Top),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct XYPosition {
    pub x: f32,
    pub y: f32,
}

impl XYPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKey {
    #[serde(rename = "PK")]
    Primary,
    #[serde(rename = "FK")]
    Foreign,
}

impl ColumnKey {
    pub fn badge(self) -> &'static str {
        match self {
            Self::Primary => "PK",
            Self::Foreign => "FK",
        }
    }
}

// The editor sends "", "none" or null for plain columns.
fn deserialize_column_key<'de, D>(deserializer: D) -> Result<Option<ColumnKey>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        Some(key) if key.eq_ignore_ascii_case("pk") => Some(ColumnKey::Primary),
        Some(key) if key.eq_ignore_ascii_case("fk") => Some(ColumnKey::Foreign),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(
        default,
        deserialize_with = "deserialize_column_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub key: Option<ColumnKey>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<Column>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One table of the diagram as the canvas sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub position: XYPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Map<String, Value>>,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandlePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandlePosition>,
    #[serde(default)]
    pub draggable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl Node {
    pub fn table(id: &str, label: &str, schema: Vec<Column>) -> Self {
        Self {
            id: id.to_string(),
            kind: Some("table".to_string()),
            position: XYPosition::default(),
            width: None,
            height: None,
            style: None,
            data: NodeData {
                label: Some(label.to_string()),
                schema: Some(schema),
                extra: Map::new(),
            },
            source_position: None,
            target_position: None,
            draggable: false,
            selected: false,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.data.label.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        self.data.schema.as_deref().unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.columns().len()
    }

    /// Numeric `style.width` / `style.height`; CSS strings such as "200px" are ignored.
    pub fn style_dimension(&self, key: &str) -> Option<f32> {
        self.style
            .as_ref()
            .and_then(|style| style.get(key))
            .and_then(Value::as_f64)
            .map(|value| value as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(id: &str, source: &str, target: &str) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
            marker_start: None,
            marker_end: None,
            kind: None,
            label: None,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

/// A single edit coming from the canvas: drag, resize, delete or selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    Position {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<XYPosition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        dimensions: Dimensions,
    },
    Remove {
        id: String,
    },
    Select {
        id: String,
        selected: bool,
    },
}

impl NodeChange {
    pub fn moved(id: &str, x: f32, y: f32) -> Self {
        Self::Position {
            id: id.to_string(),
            position: Some(XYPosition::new(x, y)),
            dragging: Some(true),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Position { id, .. }
            | Self::Dimensions { id, .. }
            | Self::Remove { id }
            | Self::Select { id, .. } => id,
        }
    }
}

/// Applies a change batch and returns the updated node list.
pub fn apply_node_changes(nodes: &[Node], changes: &[NodeChange]) -> Vec<Node> {
    let mut updated: Vec<Node> = nodes.to_vec();
    for change in changes {
        match change {
            NodeChange::Remove { id } => updated.retain(|node| &node.id != id),
            NodeChange::Position { id, position, .. } => {
                if let (Some(node), Some(position)) =
                    (updated.iter_mut().find(|node| &node.id == id), position)
                {
                    node.position = *position;
                }
            }
            NodeChange::Dimensions { id, dimensions } => {
                if let Some(node) = updated.iter_mut().find(|node| &node.id == id) {
                    node.width = Some(dimensions.width);
                    node.height = Some(dimensions.height);
                }
            }
            NodeChange::Select { id, selected } => {
                if let Some(node) = updated.iter_mut().find(|node| &node.id == id) {
                    node.selected = *selected;
                }
            }
        }
    }
    updated
}

/// Diagram resource as stored by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Diagram {
    pub fn from_json(input: &str) -> Result<Self, DiagramError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DiagramError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
