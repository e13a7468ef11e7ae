//! Wine Cellar Backend
//!
//! A REST backend for a personal wine collection, storing each wine as a JSON document.

mod api;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use db::{ConnectionCache, SqliteConnector, WineRepository};
use errors::AppError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<WineRepository>,
}

impl AppState {
    /// Build the state for `config`. No connection is opened yet.
    pub fn new(config: &Config) -> Self {
        let connector = SqliteConnector {
            max_connections: config.db_max_connections,
        };
        let connections = ConnectionCache::new(connector, config.database_url.clone());

        Self {
            repo: Arc::new(WineRepository::new(connections)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Wine Cellar Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    let state = AppState::new(&config);

    // Warm the connection cache. A missing URL is fatal; anything else is retried on demand.
    match state.repo.pool().await {
        Ok(_) => {}
        Err(e @ AppError::Configuration(_)) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
        Err(e) => tracing::warn!("Database not reachable at startup, will retry: {}", e),
    }

    let repo = Arc::clone(&state.repo);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.disconnect().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        .route("/wines", get(api::list_wines).post(api::create_wine))
        .route(
            "/wines/{slug}",
            get(api::get_wine)
                .put(api::update_wine)
                .delete(api::delete_wine),
        );

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
