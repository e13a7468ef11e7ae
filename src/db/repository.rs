//! Database repository for wine CRUD operations.
//!
//! Every operation goes through the connection cache first. Validation happens here,
//! at the model boundary, so handlers never duplicate it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use super::{ConnectionCache, SqliteConnector};
use crate::errors::AppError;
use crate::models::{apply_patch, Wine, WineInput};

/// Database repository for all wine operations.
pub struct WineRepository {
    connections: ConnectionCache<SqliteConnector>,
}

impl WineRepository {
    pub fn new(connections: ConnectionCache<SqliteConnector>) -> Self {
        Self { connections }
    }

    /// Get the pool, connecting on first use.
    pub async fn pool(&self) -> Result<SqlitePool, AppError> {
        self.connections.ensure_connected().await
    }

    /// Drop the cached pool and close it. The next operation reconnects.
    pub async fn disconnect(&self) {
        if let Some(pool) = self.connections.reset() {
            pool.close().await;
            tracing::info!("Database pool closed");
        }
    }

    /// List all wines, newest first.
    pub async fn list(&self) -> Result<Vec<Wine>, AppError> {
        let pool = self.pool().await?;
        let rows = sqlx::query("SELECT document FROM wines ORDER BY created_at DESC, id")
            .fetch_all(&pool)
            .await?;

        rows.iter().map(wine_from_row).collect()
    }

    /// Get a wine by its slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Wine>, AppError> {
        let pool = self.pool().await?;
        let row = sqlx::query("SELECT document FROM wines WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&pool)
            .await?;

        row.as_ref().map(wine_from_row).transpose()
    }

    /// Every stored slug, oldest first. Used to give context on lookup misses.
    pub async fn known_slugs(&self) -> Result<Vec<String>, AppError> {
        let pool = self.pool().await?;
        let rows = sqlx::query("SELECT slug FROM wines ORDER BY created_at, id")
            .fetch_all(&pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("slug")).collect())
    }

    /// Validate and store a new wine.
    pub async fn create(&self, input: WineInput) -> Result<Wine, AppError> {
        let now = Utc::now();
        let wine = input.into_wine(uuid::Uuid::new_v4().to_string(), now, now)?;
        let document = encode(&wine)?;
        let pool = self.pool().await?;

        sqlx::query(
            "INSERT INTO wines (id, slug, document, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&wine.id)
        .bind(&wine.slug)
        .bind(&document)
        .bind(timestamp(&wine.created_at))
        .bind(timestamp(&wine.updated_at))
        .execute(&pool)
        .await?;

        tracing::info!("Created wine {} ({})", wine.slug, wine.id);
        Ok(wine)
    }

    /// Merge `patch` into the wine stored under `slug` and re-validate the result.
    ///
    /// Returns `None` without touching the store if no wine has that slug. The write only
    /// lands if the record is unchanged since it was read; otherwise the update conflicts.
    pub async fn update_by_slug(
        &self,
        slug: &str,
        patch: &Value,
    ) -> Result<Option<Wine>, AppError> {
        let pool = self.pool().await?;

        let row = sqlx::query("SELECT document, updated_at FROM wines WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let existing = wine_from_row(&row)?;
        let read_at: String = row.get("updated_at");

        let updated = apply_patch(&existing, patch)?.into_wine(
            existing.id.clone(),
            existing.created_at,
            Utc::now(),
        )?;
        let document = encode(&updated)?;

        // Conditional UPDATE so a concurrent write between read and write is detected
        let result = sqlx::query(
            "UPDATE wines SET slug = ?, document = ?, updated_at = ? WHERE id = ? AND updated_at = ?",
        )
        .bind(&updated.slug)
        .bind(&document)
        .bind(timestamp(&updated.updated_at))
        .bind(&updated.id)
        .bind(&read_at)
        .execute(&pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("Concurrent modification of wine {}", slug);
            return Err(AppError::Conflict(
                "Concurrent modification detected".to_string(),
            ));
        }

        tracing::info!("Updated wine {} ({})", updated.slug, updated.id);
        Ok(Some(updated))
    }

    /// Delete the wine stored under `slug`. Returns whether one was removed.
    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool, AppError> {
        let pool = self.pool().await?;
        let result = sqlx::query("DELETE FROM wines WHERE slug = ?")
            .bind(slug)
            .execute(&pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("Deleted wine {}", slug);
        }
        Ok(deleted)
    }
}

/// Fixed-width UTC timestamps so the text column sorts chronologically.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode(wine: &Wine) -> Result<String, AppError> {
    serde_json::to_string(wine)
        .map_err(|e| AppError::Internal(format!("Failed to encode wine {}: {}", wine.id, e)))
}

fn wine_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Wine, AppError> {
    let document: String = row.get("document");
    serde_json::from_str(&document).map_err(|e| {
        tracing::error!("Corrupt wine document: {}", e);
        AppError::Persistence(format!("Stored wine document is unreadable: {}", e))
    })
}
