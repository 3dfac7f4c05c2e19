use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagramError {
    #[error("invalid diagram JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown layout direction `{0}` (expected LR or TB)")]
    UnknownDirection(String),
    #[error("backend rejected the request: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error payload of a `{ success: false, error: { code, message } }` response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed stream event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown stream event type `{0}`")]
    UnknownEvent(String),
}
