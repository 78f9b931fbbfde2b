//! Token repository trait defining the interface for refresh token persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::token::RefreshToken;
use crate::errors::DomainError;

/// Repository trait for refresh tokens
///
/// # Security Considerations
/// - Tokens are stored as SHA-256 hashes, never in the clear
/// - Revocation must be atomic so that of two concurrent rotations of the
///   same refresh token only one succeeds
/// - Expired rows should be periodically cleaned up
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Save a new refresh token
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError>;

    /// Find a refresh token by its `jti`
    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshToken>, DomainError>;

    /// Revoke one refresh token
    ///
    /// # Returns
    /// * `Ok(true)` - the token was active and is now revoked
    /// * `Ok(false)` - unknown or already revoked
    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, DomainError>;

    /// Revoke every token of a rotation chain, returning how many changed
    async fn revoke_token_family(&self, family: Uuid) -> Result<usize, DomainError>;

    /// Delete expired refresh tokens, returning how many were removed
    async fn delete_expired_tokens(&self) -> Result<usize, DomainError>;
}
