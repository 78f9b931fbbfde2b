//! Access and refresh token claims plus the stored refresh-token record.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cm_shared::config::JwtConfig;

use crate::domain::entities::user::{User, UserRole};

/// Which of the pair a JWT is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT payload shared by both token types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,

    pub iss: String,

    pub aud: String,

    /// Unique token id; refresh rows are keyed by it
    pub jti: String,

    pub token_type: TokenType,

    /// Only set on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default)]
    pub is_staff: bool,

    /// Rotation chain a refresh token belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl Claims {
    /// Claims for an access token carrying the user's role and flags
    pub fn new_access_token(user: &User, config: &JwtConfig, now: DateTime<Utc>) -> Self {
        Self {
            role: Some(user.role),
            is_verified: user.is_verified,
            is_staff: user.is_staff,
            ..Self::base(user.id, TokenType::Access, config.access_token_expiry, config, now)
        }
    }

    /// Claims for a refresh token in rotation chain `family`
    pub fn new_refresh_token(user_id: Uuid, family: Uuid, config: &JwtConfig, now: DateTime<Utc>) -> Self {
        Self {
            family: Some(family.to_string()),
            ..Self::base(user_id, TokenType::Refresh, config.refresh_token_expiry, config, now)
        }
    }

    fn base(user_id: Uuid, token_type: TokenType, lifetime: i64, config: &JwtConfig, now: DateTime<Utc>) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime)).timestamp(),
            nbf: now.timestamp(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            token_type,
            role: None,
            is_verified: false,
            is_staff: false,
            family: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// Refresh token record, stored by hash and keyed by its `jti`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub jti: String,

    pub user_id: Uuid,

    /// SHA-256 of the encoded token
    pub token_hash: String,

    pub family: Uuid,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    pub is_revoked: bool,
}

impl RefreshToken {
    pub fn new(claims: &Claims, user_id: Uuid, family: Uuid, token_hash: String) -> Self {
        Self {
            jti: claims.jti.clone(),
            user_id,
            token_hash,
            family,
            created_at: Utc::now(),
            expires_at: claims.expires_at(),
            is_revoked: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Not expired and not revoked
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked
    }
}

/// Issued pair; serialized as `access`, `refresh`, `token_type`, `expires_in`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "access")]
    pub access_token: String,

    #[serde(rename = "refresh")]
    pub refresh_token: String,

    /// Always `Bearer`
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
