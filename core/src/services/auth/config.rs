//! Configuration for the authentication service

use cm_shared::config::{AppConfig, PasswordConfig, RateLimitConfig};

/// Configuration for the authentication service
#[derive(Debug, Clone, Default)]
pub struct AuthServiceConfig {
    /// Login and refresh limits
    pub rate_limit: RateLimitConfig,
    /// bcrypt cost and password policy
    pub password: PasswordConfig,
}

impl AuthServiceConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            rate_limit: config.rate_limit.clone(),
            password: config.auth.password.clone(),
        }
    }

    /// Fast hashing and default limits
    pub fn for_tests() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            password: PasswordConfig::for_tests(),
        }
    }
}
