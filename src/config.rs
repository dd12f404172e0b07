//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::constants::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_JWT_EXPIRY_HOURS, DEFAULT_NSFW_CHECKS_PER_MINUTE,
    DEFAULT_NSFW_DETECTOR_URL, DEFAULT_NSFW_THRESHOLD, DEFAULT_SCHEDULER_LEASE_SECS,
    DEFAULT_SCHEDULER_POLL_INTERVAL_SECS, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_STORAGE_BASE_URL, DEFAULT_STORAGE_BUCKET,
};

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub nsfw: NsfwConfig,
    pub scheduler: SchedulerConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// Emit JSON log lines instead of the human-readable format
    pub json_logs: bool,
}

/// Which store implementation backs the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORE_BACKEND".to_string())),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Required when the backend is Postgres
    pub url: Option<String>,
    pub max_connections: u32,
}

/// JWT authentication configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: i64,
}

/// Object storage configuration for the download proxy
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
}

impl StorageConfig {
    /// Object listing endpoint for the configured bucket
    pub fn objects_url(&self) -> String {
        format!("{}/{}/o", self.base_url.trim_end_matches('/'), self.bucket)
    }
}

/// NSFW pre-check configuration
#[derive(Debug, Clone)]
pub struct NsfwConfig {
    pub detector_url: String,
    pub threshold: f64,
    pub checks_per_minute: u32,
}

/// Scheduled upload worker configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub lease_secs: i64,
    pub worker_id: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            nsfw: NsfwConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
        })
    }
}

/// Read an optional variable and parse it, falling back to a default
fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: parse_or("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend: StoreBackend = match env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let url = env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL".to_string()));
        }

        Ok(Self {
            backend,
            url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
        })
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET".to_string()))?,
            expiry_hours: parse_or("JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS)?,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BASE_URL.to_string()),
            bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string()),
        })
    }
}

impl NsfwConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let threshold: f64 = parse_or("NSFW_THRESHOLD", DEFAULT_NSFW_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue("NSFW_THRESHOLD".to_string()));
        }

        Ok(Self {
            detector_url: env::var("NSFW_DETECTOR_URL")
                .unwrap_or_else(|_| DEFAULT_NSFW_DETECTOR_URL.to_string()),
            threshold,
            checks_per_minute: parse_or("NSFW_CHECKS_PER_MINUTE", DEFAULT_NSFW_CHECKS_PER_MINUTE)?,
        })
    }
}

impl SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let poll_interval_secs: u64 =
            parse_or("SCHEDULER_POLL_INTERVAL_SECS", DEFAULT_SCHEDULER_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("SCHEDULER_POLL_INTERVAL_SECS".to_string()));
        }

        Ok(Self {
            enabled: parse_or("SCHEDULER_ENABLED", true)?,
            poll_interval_secs,
            lease_secs: parse_or("SCHEDULER_LEASE_SECS", DEFAULT_SCHEDULER_LEASE_SECS)?,
            worker_id: env::var("SCHEDULER_WORKER_ID")
                .unwrap_or_else(|_| format!("worker-{}", uuid::Uuid::new_v4())),
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            rust_log: "info".to_string(),
            json_logs: false,
        };
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_objects_url_trims_trailing_slash() {
        let storage = StorageConfig {
            base_url: "https://storage.example.com/v0/b/".to_string(),
            bucket: "assets-bucket".to_string(),
        };
        assert_eq!(
            storage.objects_url(),
            "https://storage.example.com/v0/b/assets-bucket/o"
        );
    }
}
