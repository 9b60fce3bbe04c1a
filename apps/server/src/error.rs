//! Error types for netra-server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use netra_core::NetraError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Pipeline could not be reached or failed (502)
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<NetraError> for ApiError {
    fn from(err: NetraError) -> Self {
        match err {
            NetraError::UnsupportedVideo { .. } => ApiError::BadRequest(err.to_string()),
            NetraError::PipelineFailed { .. }
            | NetraError::InvalidPipelineOutput { .. }
            | NetraError::ApiError(_) => ApiError::Pipeline(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Pipeline(msg) => (StatusCode::BAD_GATEWAY, "PIPELINE_FAILED", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
