//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::boundary::InputError;
use crate::sessions::SessionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                detail,
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::ItemNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            SessionError::DuplicateItem(_) => ApiError::BadRequest(err.to_string()),
            SessionError::LockPoisoned => ApiError::Internal("lock poisoned".into()),
            SessionError::Validation(e) => ApiError::Validation(e.to_string()),
        }
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::safety::ValidationError;

    #[test]
    fn session_errors_map_to_status() {
        let cases = [
            (SessionError::NotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (SessionError::ItemNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (SessionError::DuplicateItem(Uuid::nil()), StatusCode::BAD_REQUEST),
            (SessionError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
            (
                SessionError::Validation(ValidationError::MissingCustomText),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn input_error_is_bad_request() {
        let resp = ApiError::from(InputError::EmptyQuickEntry).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
