//! Redis connection used for shared rate-limit counters

use serde::{Deserialize, Serialize};

use super::env_or;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub url: String,
    /// Per-attempt connect timeout in seconds
    pub connection_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Namespace prepended to every key, e.g. one per deployment
    #[serde(default)]
    pub key_prefix: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new("redis://127.0.0.1:6379")
    }
}

impl CacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout: 5,
            max_retries: default_max_retries(),
            key_prefix: None,
        }
    }

    /// `REDIS_URL` and `REDIS_KEY_PREFIX`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("REDIS_URL", defaults.url),
            key_prefix: std::env::var("REDIS_KEY_PREFIX").ok().filter(|p| !p.is_empty()),
            ..defaults
        }
    }

    pub fn prefixed(&self, key: &str) -> String {
        match self.key_prefix.as_deref() {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}
