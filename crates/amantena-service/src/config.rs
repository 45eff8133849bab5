//! Application configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults.

use serde::{Deserialize, Serialize};
use std::env;

use amantena_core::INVITE_EXPIRY_DAYS;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Base URL used to build invite registration links
    pub base_url: String,

    /// How many days a fresh or resent invite stays valid
    pub invite_expiry_days: i64,

    /// Maximum rows returned by list endpoints
    pub list_limit: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = AppConfig {
            database_path: env::var("AMANTENA_DB_PATH")
                .unwrap_or_else(|_| "./amantena.db".to_string()),

            base_url: env::var("AMANTENA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            invite_expiry_days: env::var("AMANTENA_INVITE_EXPIRY_DAYS")
                .unwrap_or_else(|_| INVITE_EXPIRY_DAYS.to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("AMANTENA_INVITE_EXPIRY_DAYS".to_string())
                })?,

            list_limit: env::var("AMANTENA_LIST_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("AMANTENA_LIST_LIMIT".to_string()))?,
        };

        if config.invite_expiry_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "AMANTENA_INVITE_EXPIRY_DAYS".to_string(),
            ));
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "./amantena.db".to_string(),
            base_url: "http://localhost:3000".to_string(),
            invite_expiry_days: INVITE_EXPIRY_DAYS,
            list_limit: 100,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
