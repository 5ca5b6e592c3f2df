// src/config.rs

use dotenvy::dotenv;
use std::{env, fmt};

/// Default token lifetime: 3 hours.
const DEFAULT_JWT_EXPIRATION: u64 = 3 * 60 * 60;
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string, or `memory` for the in-process store.
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = parsed("JWT_EXPIRATION", DEFAULT_JWT_EXPIRATION)?;
        let port = parsed("PORT", DEFAULT_PORT)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            port,
            rust_log,
        })
    }

    /// Whether the service should run against the in-process store.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.eq_ignore_ascii_case("memory")
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid(key, raw)),
        },
        Err(_) => Ok(default),
    }
}
