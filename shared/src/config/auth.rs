//! Token signing and password hashing settings

use serde::{Deserialize, Serialize};

use super::env_or;

const DEVELOPMENT_SECRET: &str = "campus-move-development-secret";

/// HS256 signing key and token lifetimes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: i64,
    /// `iss` claim, checked on decode
    pub issuer: String,
    /// `aud` claim, checked on decode
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEVELOPMENT_SECRET.to_string(),
            access_token_expiry: 60 * 60,
            refresh_token_expiry: 7 * 24 * 60 * 60,
            issuer: "campus-move".to_string(),
            audience: "campus-move-api".to_string(),
        }
    }
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Still signing with the built-in key; refused in production
    pub fn is_using_default_secret(&self) -> bool {
        self.secret == DEVELOPMENT_SECRET
    }
}

/// bcrypt cost and minimum length for new passwords
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasswordConfig {
    pub bcrypt_cost: u32,
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt_default_cost(),
            min_length: 8,
        }
    }
}

impl PasswordConfig {
    /// bcrypt's minimum cost, so hashing does not dominate test time
    pub fn for_tests() -> Self {
        Self {
            bcrypt_cost: 4,
            ..Self::default()
        }
    }
}

fn bcrypt_default_cost() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
}

impl AuthConfig {
    /// `JWT_SECRET`, `JWT_ACCESS_TOKEN_EXPIRY`, `JWT_REFRESH_TOKEN_EXPIRY`
    /// (seconds) and `BCRYPT_COST`
    pub fn from_env() -> Self {
        let jwt = JwtConfig::default();
        let password = PasswordConfig::default();
        Self {
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", jwt.secret),
                access_token_expiry: env_or("JWT_ACCESS_TOKEN_EXPIRY", jwt.access_token_expiry),
                refresh_token_expiry: env_or("JWT_REFRESH_TOKEN_EXPIRY", jwt.refresh_token_expiry),
                ..jwt
            },
            password: PasswordConfig {
                bcrypt_cost: env_or("BCRYPT_COST", password.bcrypt_cost),
                ..password
            },
        }
    }
}
