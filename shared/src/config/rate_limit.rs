//! Rate limiting configuration module

use serde::{Deserialize, Serialize};

use super::{env_flag, env_or};

/// Where rate-limit counters are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Counters live in this process only
    #[default]
    Memory,
    /// Counters live in Redis and are shared by every worker
    Redis,
}

impl std::str::FromStr for RateLimitBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(RateLimitBackend::Memory),
            "redis" => Ok(RateLimitBackend::Redis),
            _ => Err(format!("Invalid rate limit backend: {}", s)),
        }
    }
}

/// A fixed-window limit: at most `max_requests` per `window_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowLimit {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl WindowLimit {
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_seconds: 60,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Counter store
    #[serde(default)]
    pub backend: RateLimitBackend,

    /// Login attempts per client
    pub login: WindowLimit,

    /// Token refresh attempts per client
    pub refresh: WindowLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: RateLimitBackend::default(),
            login: WindowLimit::per_minute(5),
            refresh: WindowLimit::per_minute(10),
        }
    }
}

impl RateLimitConfig {
    /// `RATE_LIMIT_ENABLED` and `RATE_LIMIT_BACKEND`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", defaults.enabled),
            backend: env_or("RATE_LIMIT_BACKEND", defaults.backend),
            ..defaults
        }
    }

    /// Same limits, counters kept in Redis
    pub fn with_backend(mut self, backend: RateLimitBackend) -> Self {
        self.backend = backend;
        self
    }
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.login, WindowLimit { max_requests: 5, window_seconds: 60 });
        assert_eq!(config.refresh, WindowLimit { max_requests: 10, window_seconds: 60 });
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("redis".parse::<RateLimitBackend>().unwrap(), RateLimitBackend::Redis);
        assert!("memcached".parse::<RateLimitBackend>().is_err());
    }
}
