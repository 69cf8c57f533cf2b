// src/error.rs
//! Domain error taxonomy shared by the registry, store, pipeline and HTTP layer.

use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Body missing, not JSON, or the wrong shape.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

/// Rejections raised while adding a source to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("empty")]
    Empty,

    #[error("duplicate")]
    Duplicate,
}

impl ServiceError {
    pub fn entity_not_found(entity_id: &str) -> Self {
        Self::NotFound(format!("entity '{entity_id}'"))
    }

    pub fn room_not_found(room_id: &str) -> Self {
        Self::NotFound(format!("room '{room_id}'"))
    }

    /// Stable machine-readable kind used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) | Self::InvalidBody(_) => "validation_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Failure of a single source during an ingestion run. Never escapes the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SourceFetchError {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
