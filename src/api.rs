//! Payload shapes of the diagram backend. No requests are made from here; the
//! host application owns transport and cookies.

use crate::error::{ApiError, DiagramError};
use crate::model::Diagram;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// `{ success, data }` or `{ success: false, error: { code, message } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            let body = self.error.unwrap_or_default();
            return Err(ApiError {
                code: if body.code.is_empty() {
                    "UNKNOWN".to_string()
                } else {
                    body.code
                },
                message: if body.message.is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    body.message
                },
            });
        }
        self.data.ok_or_else(|| ApiError {
            code: "EMPTY_RESPONSE".to_string(),
            message: "response carried no data".to_string(),
        })
    }
}

pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, DiagramError> {
    let response: ApiResponse<T> = serde_json::from_str(body)?;
    Ok(response.into_result()?)
}

/// Message to show for a failed call: `error.message` when present.
pub fn error_message(body: &Value, fallback: &str) -> String {
    body.get("error")
        .and_then(|error| match error {
            Value::String(message) => Some(message.as_str()),
            other => other.get("message").and_then(Value::as_str),
        })
        .or_else(|| body.get("message").and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

pub fn error_message_from_str(raw: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(raw)
        .map(|body| error_message(&body, fallback))
        .unwrap_or_else(|_| fallback.to_string())
}

/// Accepts either a bare diagram resource or one wrapped in a response envelope.
pub fn parse_diagram_document(input: &str) -> Result<Diagram, DiagramError> {
    let value: Value = serde_json::from_str(input)?;
    if value.get("success").is_some_and(Value::is_boolean) {
        let response: ApiResponse<Diagram> = serde_json::from_value(value)?;
        return Ok(response.into_result()?);
    }
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Register,
    Login,
    Me,
    Logout,
    ListDiagrams,
    CreateDiagram,
    GetDiagram(String),
    UpdateDiagram(String),
    DeleteDiagram(String),
    GenerateDiagram(String),
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Me | Endpoint::ListDiagrams | Endpoint::GetDiagram(_) => Method::Get,
            Endpoint::Register | Endpoint::Login | Endpoint::Logout | Endpoint::CreateDiagram => {
                Method::Post
            }
            Endpoint::UpdateDiagram(_) | Endpoint::GenerateDiagram(_) => Method::Patch,
            Endpoint::DeleteDiagram(_) => Method::Delete,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::Register => "/api/register".to_string(),
            Endpoint::Login => "/api/login".to_string(),
            Endpoint::Me => "/api/me".to_string(),
            Endpoint::Logout => "/api/logout".to_string(),
            Endpoint::ListDiagrams | Endpoint::CreateDiagram => "/api/diagrams".to_string(),
            Endpoint::GetDiagram(id)
            | Endpoint::UpdateDiagram(id)
            | Endpoint::DeleteDiagram(id) => format!("/api/diagrams/{id}"),
            Endpoint::GenerateDiagram(id) => format!("/api/diagrams/{id}/stream?stream=true"),
        }
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Endpoint::GenerateDiagram(_))
    }
}

/// Body of the generation stream request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model: String,
}

/// Body of a diagram update; only the fields being synced are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<&'a [crate::model::Node]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<&'a [crate::model::Edge]>,
}

impl<'a> DiagramPatch<'a> {
    pub fn layout(diagram: &'a Diagram) -> Self {
        Self {
            title: None,
            nodes: Some(diagram.nodes.as_slice()),
            edges: Some(diagram.edges.as_slice()),
        }
    }
}
