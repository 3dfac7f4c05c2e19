use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub header_fill: String,
    pub header_text_color: String,
    pub body_fill: String,
    pub text_color: String,
    pub muted_text_color: String,
    pub border_color: String,
    pub line_color: String,
    pub primary_key_color: String,
    pub foreign_key_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "'trebuchet ms', verdana, arial, sans-serif".to_string(),
            font_size: 13.0,
            header_fill: "#ECECFF".to_string(),
            header_text_color: "#333333".to_string(),
            body_fill: "#FFFFFF".to_string(),
            text_color: "#333333".to_string(),
            muted_text_color: "#777777".to_string(),
            border_color: "#9370DB".to_string(),
            line_color: "#333333".to_string(),
            primary_key_color: "#B8860B".to_string(),
            foreign_key_color: "#4169E1".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            header_fill: "#1C2430".to_string(),
            header_text_color: "#F8FAFF".to_string(),
            body_fill: "#F8FAFF".to_string(),
            text_color: "#1C2430".to_string(),
            muted_text_color: "#7A8AA6".to_string(),
            border_color: "#C7D2E5".to_string(),
            line_color: "#7A8AA6".to_string(),
            primary_key_color: "#D97706".to_string(),
            foreign_key_color: "#2563EB".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}
