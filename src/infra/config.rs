//! Centralized configuration (environment variables + defaults).

use crate::crypto::{CryptoError, SecretKey};
use thiserror::Error;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";
pub const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("ENCRYPTION_KEY must be 32 bytes of hex: {0}")]
    InvalidKey(#[source] CryptoError),

    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// sqlx SQLite URL, e.g. `sqlite://bets.db` or `sqlite::memory:`.
    pub database_url: String,
    /// Loaded once at startup and never rotated while running.
    pub encryption_key: SecretKey,
    pub max_connections: u32,
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required(DATABASE_URL)?;
        let encryption_key =
            SecretKey::from_hex(&required(ENCRYPTION_KEY)?).map_err(ConfigError::InvalidKey)?;

        let max_connections = match lookup(DATABASE_MAX_CONNECTIONS) {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: DATABASE_MAX_CONNECTIONS,
                    value: raw.clone(),
                })?,
        };

        Ok(Self {
            database_url,
            encryption_key,
            max_connections,
        })
    }
}
