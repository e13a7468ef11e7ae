//! REST API module.
//!
//! Handlers translate requests into repository calls and results into JSON responses.
//! Success bodies are the bare records; failures go through [`AppError`]'s response mapping.

mod wines;

pub use wines::*;

use axum::{extract::rejection::JsonRejection, Json};

use crate::errors::AppError;

/// Result type returned by every handler.
pub type ApiResult<T> = Result<T, AppError>;

/// Unwrap a JSON body, turning axum's rejection into a `BAD_REQUEST` error body.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(AppError::from)
}
