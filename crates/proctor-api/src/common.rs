// Common DTOs and error mapping for the public API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use proctor_core::ProctorError;

/// Response wrapper for list endpoints.
/// All list endpoints return responses wrapped in a `data` field.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListResponse<T> {
    /// Array of items returned by the list operation.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// HTTP projection of the engine's error taxonomy
///
/// Every engine error is an expected, recoverable condition; the ingest
/// failures in particular must come back as error bodies on a live
/// connection, never as a torn-down stream.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<ProctorError> for ApiError {
    fn from(err: ProctorError) -> Self {
        let status = match &err {
            ProctorError::DuplicateSession(_)
            | ProctorError::InvalidTransition { .. }
            | ProctorError::SessionClosed(_) => StatusCode::CONFLICT,
            ProctorError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ProctorError::InvalidEvent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProctorError::Store(_) => {
                tracing::error!("store failure: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}
