//! HTTP listener and cross-origin settings

use serde::{Deserialize, Serialize};

use super::{env_list, env_or};

/// Base64 image bodies need headroom over the 5 MiB image limit
const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Actix worker count; 0 leaves actix's per-core default
    #[serde(default)]
    pub workers: usize,
    /// JSON body limit in bytes
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,
    /// Peer addresses allowed to set `X-Forwarded-For`, `X-Real-IP` and
    /// `X-Forwarded-Proto`
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            workers: 0,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            trusted_proxies: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `SERVER_HOST`, `SERVER_PORT`, `SERVER_WORKERS`, `TRUSTED_PROXIES`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_or("SERVER_HOST", defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            workers: env_or("SERVER_WORKERS", defaults.workers),
            max_payload_size: env_or("SERVER_MAX_PAYLOAD", defaults.max_payload_size),
            trusted_proxies: env_list("TRUSTED_PROXIES").unwrap_or_default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_max_payload_size() -> usize {
    DEFAULT_MAX_PAYLOAD
}

/// Browser origins allowed to call the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Exact origins, or `*` for any
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Ignored while any origin is allowed
    #[serde(default)]
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    #[serde(default = "default_max_age")]
    pub max_age: usize,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allow_credentials: false,
            max_age: default_max_age(),
        }
    }
}

impl CorsConfig {
    /// Any origin, no credentials
    pub fn development() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age: 3600,
            ..Self::default()
        }
    }

    /// `CORS_ALLOWED_ORIGINS`; an explicit list enables credentials
    pub fn from_env() -> Self {
        match env_list("CORS_ALLOWED_ORIGINS") {
            Some(origins) => Self {
                allowed_origins: origins,
                allow_credentials: true,
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

fn default_max_age() -> usize {
    86_400
}
