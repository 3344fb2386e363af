use std::fmt;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Body returned by the proxy routes when an upstream call fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub status: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "status": self.status, "message": self.message })
    }
}

/// Body returned by the local endpoints (explore, graph utilities).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum UpstreamError {
    UnknownService(String),
    Build(reqwest::Error),
    Transport { url: String, source: reqwest::Error },
    Status { url: String, status: StatusCode },
    UnparseableJson { service: String },
    UnparseableYaml(serde_yaml::Error),
    MissingField { service: String, field: &'static str },
}

impl UpstreamError {
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.to_string())
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::UnknownService(name) => write!(f, "no service configured for `{name}`"),
            UpstreamError::Build(err) => write!(f, "could not build upstream request: {err}"),
            UpstreamError::Transport { url, .. } => write!(f, "Error from {url}"),
            UpstreamError::Status { url, status } => write!(f, "Error from {url}: {status}"),
            UpstreamError::UnparseableJson { service } => {
                write!(f, "received unparseable JSON response from {service}")
            }
            UpstreamError::UnparseableYaml(_) => write!(
                f,
                "Failed to load Biolink model specification: could not parse YAML"
            ),
            UpstreamError::MissingField { service, field } => {
                write!(f, "response from {service} is missing `{field}`")
            }
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpstreamError::Build(err) | UpstreamError::Transport { source: err, .. } => Some(err),
            UpstreamError::UnparseableYaml(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ExploreError {
    MissingPagination,
    InvalidPagination,
    UnsupportedFilter(String),
    Unavailable,
    Database(rusqlite::Error),
    TaskJoin(tokio::task::JoinError),
}

impl ExploreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExploreError::MissingPagination
            | ExploreError::InvalidPagination
            | ExploreError::UnsupportedFilter(_) => StatusCode::BAD_REQUEST,
            ExploreError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ExploreError::Database(_) | ExploreError::TaskJoin(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to callers. Storage failures stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ExploreError::Database(_) | ExploreError::TaskJoin(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ExploreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExploreError::MissingPagination => write!(f, "Missing pagination"),
            ExploreError::InvalidPagination => write!(f, "Invalid limit or offset value"),
            ExploreError::UnsupportedFilter(name) => write!(f, "unsupported filter `{name}`"),
            ExploreError::Unavailable => write!(f, "explore database is not configured"),
            ExploreError::Database(err) => write!(f, "explore query failed: {err}"),
            ExploreError::TaskJoin(err) => write!(f, "explore query task failed: {err}"),
        }
    }
}

impl std::error::Error for ExploreError {}

impl From<rusqlite::Error> for ExploreError {
    fn from(value: rusqlite::Error) -> Self {
        ExploreError::Database(value)
    }
}
