//! Wine API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::{json_body, ApiResult};
use crate::errors::AppError;
use crate::models::{DeleteWineResponse, Wine, WineInput};
use crate::AppState;

/// GET /api/wines - List all wines, newest first.
pub async fn list_wines(State(state): State<AppState>) -> ApiResult<Json<Vec<Wine>>> {
    let wines = state.repo.list().await?;
    Ok(Json(wines))
}

/// POST /api/wines - Create a new wine.
pub async fn create_wine(
    State(state): State<AppState>,
    payload: Result<Json<WineInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Wine>)> {
    let input = json_body(payload)?;
    let wine = state.repo.create(input).await?;
    Ok((StatusCode::CREATED, Json(wine)))
}

/// GET /api/wines/{slug} - Get a single wine.
///
/// A miss reports every known slug alongside the requested one.
pub async fn get_wine(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Wine>> {
    match state.repo.get_by_slug(&slug).await? {
        Some(wine) => Ok(Json(wine)),
        None => {
            let available_slugs = state.repo.known_slugs().await?;
            tracing::debug!("No wine for slug {}; {} known", slug, available_slugs.len());
            Err(AppError::NotFound {
                slug,
                available_slugs: Some(available_slugs),
            })
        }
    }
}

/// PUT /api/wines/{slug} - Update a wine with a partial document.
pub async fn update_wine(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Wine>> {
    let patch = json_body(payload)?;

    match state.repo.update_by_slug(&slug, &patch).await? {
        Some(wine) => Ok(Json(wine)),
        None => Err(AppError::NotFound {
            slug,
            available_slugs: None,
        }),
    }
}

/// DELETE /api/wines/{slug} - Delete a wine.
pub async fn delete_wine(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<DeleteWineResponse>> {
    if state.repo.delete_by_slug(&slug).await? {
        Ok(Json(DeleteWineResponse {
            message: "Wine deleted successfully".to_string(),
        }))
    } else {
        Err(AppError::NotFound {
            slug,
            available_slugs: None,
        })
    }
}
