//! Configuration module for the cellar backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! The database connection string has no default; its absence is reported when the
//! connection cache is first used.

use std::env;
use std::net::SocketAddr;

use crate::errors::AppError;

/// Environment variable holding the document store connection string.
pub const DATABASE_URL_VAR: &str = "CELLAR_DATABASE_URL";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string for the document store
    pub database_url: Option<String>,
    /// Maximum pooled connections to the store
    pub db_max_connections: u32,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database_url = env::var(DATABASE_URL_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty());

        let db_max_connections = env::var("CELLAR_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|e| {
                AppError::Configuration(format!("Invalid CELLAR_DB_MAX_CONNECTIONS: {}", e))
            })?;

        let bind_addr = env::var("CELLAR_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Configuration(format!("Invalid CELLAR_BIND_ADDR: {}", e)))?;

        let log_level = env::var("CELLAR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("CELLAR_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            database_url,
            db_max_connections,
            bind_addr,
            log_level,
            log_format,
        })
    }
}
