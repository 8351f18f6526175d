use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::error;

use crate::models::{RepositoryError, ServiceError};

pub type ErrorResponse = (StatusCode, Json<Value>);

/// Convert service errors to HTTP responses
pub fn service_error_to_response(err: ServiceError) -> ErrorResponse {
    let (status, message) = match err {
        ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::Unauthorized
        | ServiceError::InvalidCredentials
        | ServiceError::Authentication { .. } => (StatusCode::UNAUTHORIZED, err.to_string()),
        ServiceError::Forbidden { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::Conflict { .. }
        | ServiceError::InvalidOrderTransition { .. }
        | ServiceError::InvalidBookingTransition { .. }
        | ServiceError::CapacityExceeded { .. } => (StatusCode::CONFLICT, err.to_string()),
        ServiceError::Repository { source } => match source {
            RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            RepositoryError::ConstraintViolation { .. } => {
                (StatusCode::CONFLICT, "Resource already exists".to_string())
            }
            RepositoryError::ForeignKeyViolation { .. } => (
                StatusCode::CONFLICT,
                "Resource is referenced by other records".to_string(),
            ),
            RepositoryError::Timeout => (StatusCode::REQUEST_TIMEOUT, "Request timeout".to_string()),
            other => {
                error!(error = %other, "Repository failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        },
        ServiceError::Configuration { .. } => {
            error!(error = %err, "Configuration failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
            )
        }
    };

    error_response(status, message)
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(json!({
            "error": message.into(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
