//! Main token service implementation

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use cm_shared::config::JwtConfig;

use crate::domain::entities::token::{Claims, RefreshToken, TokenPair, TokenType};
use crate::domain::entities::user::User;
use crate::errors::{DomainError, TokenError};
use crate::repositories::TokenRepository;

/// SHA-256 of an encoded token, as stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Service for issuing, rotating and revoking JWTs
pub struct TokenService {
    repository: Arc<dyn TokenRepository>,
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Creates a new HS256 token service
    pub fn new(repository: Arc<dyn TokenRepository>, config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            repository,
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Issue an access/refresh pair starting a new rotation chain
    pub async fn issue_tokens(&self, user: &User) -> Result<TokenPair, DomainError> {
        self.issue_in_family(user, Uuid::new_v4()).await
    }

    async fn issue_in_family(&self, user: &User, family: Uuid) -> Result<TokenPair, DomainError> {
        let now = Utc::now();
        let access_token = self.encode_jwt(&Claims::new_access_token(user, &self.config, now))?;

        let refresh_claims = Claims::new_refresh_token(user.id, family, &self.config, now);
        let refresh_token = self.encode_jwt(&refresh_claims)?;
        let record = RefreshToken::new(&refresh_claims, user.id, family, hash_token(&refresh_token));
        self.repository.save_refresh_token(record).await.map_err(|e| {
            warn!(error = %e, "Failed to store refresh token");
            DomainError::Token(TokenError::TokenGenerationFailed)
        })?;

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            self.config.access_token_expiry,
        ))
    }

    /// Encodes claims into a JWT
    pub(crate) fn encode_jwt(&self, claims: &Claims) -> Result<String, DomainError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|_| DomainError::Token(TokenError::TokenGenerationFailed))
    }

    /// Signature, issuer, audience and time checks only
    fn decode_jwt(&self, token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let error = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                    ErrorKind::ImmatureSignature => TokenError::TokenNotYetValid,
                    _ => TokenError::InvalidTokenFormat,
                };
                DomainError::Token(error)
            })
    }

    /// Verifies an access token and returns the claims.
    ///
    /// Access tokens are stateless: they stay valid until `exp`, even after
    /// the refresh token they were issued with is revoked.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = self.decode_jwt(token)?;
        if claims.token_type != TokenType::Access {
            return Err(DomainError::Token(TokenError::WrongTokenType));
        }
        Ok(claims)
    }

    /// Look up the stored row behind a refresh JWT
    async fn load_refresh_token(&self, token: &str) -> Result<RefreshToken, DomainError> {
        let claims = self.decode_jwt(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(DomainError::Token(TokenError::WrongTokenType));
        }
        let token_hash = hash_token(token);
        self.repository
            .find_refresh_token(&claims.jti)
            .await?
            .filter(|record| record.token_hash == token_hash)
            .ok_or(DomainError::Token(TokenError::InvalidTokenFormat))
    }

    /// Verifies a refresh token without side effects
    pub async fn verify_refresh_token(&self, token: &str) -> Result<RefreshToken, DomainError> {
        let record = self.load_refresh_token(token).await?;
        if record.is_revoked {
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }
        if record.is_expired() {
            return Err(DomainError::Token(TokenError::TokenExpired));
        }
        Ok(record)
    }

    /// Verifies a refresh token that is about to be rotated.
    ///
    /// Presenting an already revoked token means the chain leaked, so the
    /// whole family is revoked before the error is returned.
    pub async fn refresh_candidate(&self, token: &str) -> Result<RefreshToken, DomainError> {
        let record = self.load_refresh_token(token).await?;
        if record.is_revoked {
            self.revoke_family(&record).await?;
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }
        if record.is_expired() {
            return Err(DomainError::Token(TokenError::TokenExpired));
        }
        Ok(record)
    }

    /// Rotate `record` into a fresh pair in the same family.
    ///
    /// The old token is revoked atomically first; losing that race to a
    /// concurrent rotation counts as reuse.
    pub async fn rotate(&self, record: &RefreshToken, user: &User) -> Result<TokenPair, DomainError> {
        if !self.repository.revoke_refresh_token(&record.jti).await? {
            self.revoke_family(record).await?;
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }
        self.issue_in_family(user, record.family).await
    }

    async fn revoke_family(&self, record: &RefreshToken) -> Result<(), DomainError> {
        let revoked = self.repository.revoke_token_family(record.family).await?;
        warn!(
            user_id = %record.user_id,
            family = %record.family,
            revoked,
            "Refresh token reuse detected, token family revoked"
        );
        Ok(())
    }

    /// Verify any token this service issued, regardless of type
    pub async fn verify_token(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = self.decode_jwt(token)?;
        match claims.token_type {
            TokenType::Access => self.verify_access_token(token),
            TokenType::Refresh => {
                self.verify_refresh_token(token).await?;
                Ok(claims)
            }
        }
    }

    /// Revoke a refresh token so it can no longer be rotated
    pub async fn blacklist_refresh_token(&self, token: &str) -> Result<(), DomainError> {
        let record = self.verify_refresh_token(token).await?;
        if !self.repository.revoke_refresh_token(&record.jti).await? {
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }
        info!(user_id = %record.user_id, "Refresh token blacklisted");
        Ok(())
    }

    /// Removes expired refresh tokens
    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        let removed = self.repository.delete_expired_tokens().await?;
        info!(removed, "Expired tokens purged");
        Ok(removed)
    }
}
