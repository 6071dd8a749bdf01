//! API error types and HTTP status mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::responses::ErrorResponse;
use crate::core::violation::FieldViolation;
use crate::lifecycle::{ErrorKind, LifecycleError};

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed identifier or body, immutable field, unknown app.
    BadRequest(String, Vec<FieldViolation>),
    /// Resource not found.
    NotFound(String),
    /// The current status forbids the operation.
    Conflict(String),
    /// Wrong recurrence type or failed business validation.
    Unprocessable(String, Vec<FieldViolation>),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(..) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(..) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, errors) = match self {
            ApiError::BadRequest(msg, errors) | ApiError::Unprocessable(msg, errors) => {
                (msg, errors)
            }
            ApiError::NotFound(msg) | ApiError::Conflict(msg) | ApiError::Internal(msg) => {
                (msg, Vec::new())
            }
        };

        let body = ErrorResponse::new(status.as_u16(), message, errors);
        (status, Json(body)).into_response()
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let violations = err.violations().to_vec();
        let message = err.to_string();
        match err.kind() {
            ErrorKind::ClientInput => ApiError::BadRequest(message, violations),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::Unprocessable => ApiError::Unprocessable(message, violations),
            ErrorKind::Persistence => ApiError::Internal(message),
        }
    }
}
