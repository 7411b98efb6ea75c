//! Error handling for the Warehouse Inventory Management System
//!
//! Core errors abort the enclosing unit of work and surface to the HTTP
//! boundary as a structured JSON envelope. Alerting failures are never
//! routed through here; they are logged and swallowed at the call site.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Serial not found: {0}")]
    SerialNotFound(String),

    #[error("Serial already consumed: {0}")]
    SerialAlreadyConsumed(String),

    #[error("Concurrent modification, retry the request")]
    ConcurrentModification,

    // Database errors
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // Serialization failures, deadlocks and lock_timeout map to a
        // retryable conflict; everything else is a database fault.
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                if code == "40001" || code == "40P01" || code == "55P03" {
                    return AppError::ConcurrentModification;
                }
            }
        }
        AppError::Database(err)
    }
}

// Shared validation helpers report plain static messages
impl From<&'static str> for AppError {
    fn from(msg: &'static str) -> Self {
        AppError::ValidationError(msg.to_string())
    }
}

impl From<shared::TransitionError> for AppError {
    fn from(err: shared::TransitionError) -> Self {
        AppError::InvalidStateTransition(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::DuplicateEntry(entity) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", entity),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new("FORBIDDEN", msg.clone()),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone()),
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", msg.clone()),
            ),
            AppError::SerialNotFound(serial) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "SERIAL_NOT_FOUND",
                    format!("No available unit matches serial '{}'", serial),
                ),
            ),
            AppError::SerialAlreadyConsumed(serial) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "SERIAL_ALREADY_CONSUMED",
                    format!("Serial '{}' has already been consumed", serial),
                ),
            ),
            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "CONCURRENT_MODIFICATION",
                    "The record was modified concurrently, retry the request".to_string(),
                ),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                ),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod unit_tests {
    use super::*;

    // Callers hand DuplicateEntry the entity only; the response layer
    // wraps it in the full sentence exactly once.
    #[test]
    fn duplicate_entry_composes_one_sentence() {
        let err = AppError::DuplicateEntry("serial number 'SN-001'".to_string());
        assert_eq!(err.to_string(), "Duplicate entry: serial number 'SN-001'");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn static_validation_messages_map_to_bad_request() {
        let err = AppError::from("Quantity must be positive");
        assert!(matches!(&err, AppError::ValidationError(m) if m == "Quantity must be positive"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
