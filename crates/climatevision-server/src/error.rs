//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use climatevision_core::providers::relay::{
    ReceivedFields, RelayErrorBody, RelayStage, RelayStep,
};
use climatevision_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// API errors for the object and report endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Storage(StorageError::ObjectExists { .. }) => {
                (StatusCode::CONFLICT, "object_exists")
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// A step-tagged relay failure.
///
/// Request-shape failures answer 400; everything after validation answers
/// 500 with step `execution_error` and the failing stage.
#[derive(Debug)]
pub struct RelayError {
    pub status: StatusCode,
    pub body: RelayErrorBody,
}

impl RelayError {
    pub fn api_key_missing() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: RelayErrorBody::new(
                RelayStep::ApiKeyCheck,
                "FAL API key not configured. Please add FAL_API_KEY to the server environment.",
            ),
        }
    }

    pub fn invalid_json(details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: RelayErrorBody::new(RelayStep::JsonParse, "Invalid JSON in request body")
                .with_details(details),
        }
    }

    pub fn missing_parameters(received: ReceivedFields) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: RelayErrorBody::new(
                RelayStep::ParameterValidation,
                "Missing required parameters: imageData and prompt are required",
            )
            .with_received(received),
        }
    }

    pub fn execution(stage: RelayStage, error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: RelayErrorBody::new(RelayStep::ExecutionError, error).with_stage(stage),
        }
    }

    pub fn step(&self) -> RelayStep {
        self.body.step
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}
