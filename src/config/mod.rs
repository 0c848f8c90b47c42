//! Configuration module for the conference backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How often the availability announcement is recomputed
    pub announcement_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("CONFERENCE_API_PSK").ok();

        let db_path = env::var("CONFERENCE_DB_PATH")
            .unwrap_or_else(|_| "./data/conference.sqlite".to_string())
            .into();

        let bind_addr = env::var("CONFERENCE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid CONFERENCE_BIND_ADDR: {}", e)))?;

        let log_level = env::var("CONFERENCE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let interval_secs: u64 = env::var("CONFERENCE_ANNOUNCEMENT_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|e| {
                AppError::Config(format!(
                    "Invalid CONFERENCE_ANNOUNCEMENT_INTERVAL_SECS: {}",
                    e
                ))
            })?;
        if interval_secs == 0 {
            return Err(AppError::Config(
                "CONFERENCE_ANNOUNCEMENT_INTERVAL_SECS must be positive".to_string(),
            ));
        }

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            announcement_interval: Duration::from_secs(interval_secs),
        })
    }
}
