//! Configuration module with business-specific sub-modules
//!
//! - `auth` - JWT and password policy
//! - `cache` - Redis connection for shared counters
//! - `database` - storage backend and MySQL pool settings
//! - `environment` - environment detection and logging
//! - `media` - uploaded image storage
//! - `rate_limit` - login/refresh limits
//! - `server` - HTTP server and CORS

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;
pub mod media;
pub mod rate_limit;
pub mod server;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use auth::{AuthConfig, JwtConfig, PasswordConfig};
pub use cache::CacheConfig;
pub use database::{DatabaseConfig, StorageBackend};
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use media::MediaConfig;
pub use rate_limit::{RateLimitBackend, RateLimitConfig, WindowLimit};
pub use server::{CorsConfig, ServerConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration
    pub cache: CacheConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// Uploaded media
    #[serde(default)]
    pub media: MediaConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            cors: CorsConfig::development(),
            logging: LoggingConfig::for_environment(Environment::Development),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables, reading `.env` first
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        dotenvy::from_filename(environment.env_file()).ok();
        dotenvy::dotenv().ok();

        let cors = match environment {
            Environment::Development => CorsConfig::development(),
            _ => CorsConfig::from_env(),
        };

        Self {
            environment,
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            auth: AuthConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            media: MediaConfig::from_env(),
            cors,
            logging: LoggingConfig::for_environment(environment),
        }
    }

    /// Environment variables, then the optional TOML file for the
    /// environment (`config/{environment}.toml`) layered on top
    pub fn load() -> Result<Self, config::ConfigError> {
        let base = Self::from_env();
        let overlay = base.environment.config_file().to_string();
        config::Config::builder()
            .add_source(config::Config::try_from(&base)?)
            .add_source(config::File::with_name(&overlay).required(false))
            .build()?
            .try_deserialize()
    }

    /// Configuration errors that should stop the server from starting
    pub fn validate(&self) -> Result<(), String> {
        if self.environment.is_production() && self.auth.jwt.is_using_default_secret() {
            return Err("JWT_SECRET must be set in production".to_string());
        }
        if self.auth.jwt.access_token_expiry <= 0 || self.auth.jwt.refresh_token_expiry <= 0 {
            return Err("token lifetimes must be positive".to_string());
        }
        if self.rate_limit.login.max_requests == 0 || self.rate_limit.refresh.max_requests == 0 {
            return Err("rate limits must allow at least one request".to_string());
        }
        Ok(())
    }
}

/// Parsed `key`, or `default` when it is unset or does not parse
pub(crate) fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

/// `1`/`true`/`yes` and `0`/`false`/`no`, case-insensitive
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if matches!(v.as_str(), "1" | "true" | "yes") => true,
        Ok(v) if matches!(v.as_str(), "0" | "false" | "no") => false,
        _ => default,
    }
}

/// Comma separated `key`, blanks dropped; `None` when unset
pub(crate) fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = std::env::var(key).ok()?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect(),
    )
}
