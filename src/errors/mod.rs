//! Error handling module for the cellar backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response bodies.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
}

/// A single rejected field, addressed by its dotted JSON path (e.g. `tasting.rating`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Required configuration is missing or malformed
    #[error("{0}")]
    Configuration(String),
    /// One or more fields failed validation
    #[error("{}", join_field_errors(.0))]
    Validation(Vec<FieldError>),
    /// No wine exists under the requested slug
    #[error("Wine not found")]
    NotFound {
        slug: String,
        available_slugs: Option<Vec<String>>,
    },
    /// Store-level uniqueness violation
    #[error("{0}")]
    Conflict(String),
    /// Store unreachable or operation rejected
    #[error("{0}")]
    Persistence(String),
    /// Request body could not be decoded
    #[error("{0}")]
    BadRequest(String),
    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    let parts: Vec<String> = errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect();
    format!("Validation failed: {}", parts.join("; "))
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => codes::CONFIGURATION_ERROR,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::NotFound { .. } => codes::NOT_FOUND,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Persistence(_) => codes::DATABASE_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                tracing::warn!("Unique constraint violated: {}", db_err);
                return AppError::Conflict("A wine with this slug already exists".to_string());
            }
        }
        tracing::error!("Database error: {:?}", err);
        AppError::Persistence(format!("Database error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::BadRequest(rejection.body_text())
    }
}

/// Error response body.
///
/// `error` is always a plain string so clients can surface it directly.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_slugs: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let mut body = Self {
            success: false,
            error: error.message(),
            code: error.error_code().to_string(),
            details: None,
            requested_slug: None,
            available_slugs: None,
        };

        match error {
            AppError::Validation(fields) => {
                body.details = serde_json::to_value(fields).ok();
            }
            AppError::NotFound {
                slug,
                available_slugs,
            } => {
                body.requested_slug = Some(slug.clone());
                body.available_slugs = available_slugs.clone();
            }
            _ => {}
        }

        body
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}: {}", self.error_code(), self.message());
        }
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = AppError::Validation(vec![
            FieldError::new("name", "Please provide a wine name"),
            FieldError::new("type", "'Blush' is not a valid wine type"),
        ]);

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.message(),
            "Validation failed: name: Please provide a wine name; type: 'Blush' is not a valid wine type"
        );

        let body = ErrorResponse::new(&err);
        let details = body.details.unwrap();
        assert_eq!(details[1]["field"], "type");
    }

    #[test]
    fn not_found_carries_slug_context() {
        let err = AppError::NotFound {
            slug: "missing-2001".to_string(),
            available_slugs: Some(vec!["barolo-2016".to_string()]),
        };
        let body = serde_json::to_value(ErrorResponse::new(&err)).unwrap();

        assert_eq!(body["error"], "Wine not found");
        assert_eq!(body["code"], codes::NOT_FOUND);
        assert_eq!(body["requestedSlug"], "missing-2001");
        assert_eq!(body["availableSlugs"][0], "barolo-2016");
        assert!(body.get("details").is_none());
    }
}
