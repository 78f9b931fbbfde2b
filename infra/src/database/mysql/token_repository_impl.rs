//! MySQL implementation of the TokenRepository trait.
//!
//! Refresh tokens are stored by `jti` with a SHA-256 hash of the encoded
//! token. Revocation flips `is_revoked`; rows are deleted only once expired.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::MySqlRow;
use sqlx::MySqlPool;
use uuid::Uuid;

use cm_core::domain::entities::token::RefreshToken;
use cm_core::errors::DomainError;
use cm_core::repositories::TokenRepository;

use super::{col, db_err, is_unique_violation, uuid_col};

/// MySQL implementation of TokenRepository
pub struct MySqlTokenRepository {
    pool: MySqlPool,
}

impl MySqlTokenRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_token(row: &MySqlRow) -> Result<RefreshToken, DomainError> {
        Ok(RefreshToken {
            jti: col(row, "jti")?,
            user_id: uuid_col(row, "user_id")?,
            token_hash: col(row, "token_hash")?,
            family: uuid_col(row, "family")?,
            created_at: col(row, "created_at")?,
            expires_at: col(row, "expires_at")?,
            is_revoked: col(row, "is_revoked")?,
        })
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (jti, user_id, token_hash, family, created_at, expires_at, is_revoked)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.jti)
        .bind(token.user_id.to_string())
        .bind(&token.token_hash)
        .bind(token.family.to_string())
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(token.is_revoked)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::Conflict {
                    message: "Token already exists".to_string(),
                }
            } else {
                db_err("Failed to save refresh token")(e)
            }
        })?;

        Ok(token)
    }

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshToken>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT jti, user_id, token_hash, family, created_at, expires_at, is_revoked
            FROM refresh_tokens
            WHERE jti = ?
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find refresh token"))?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, DomainError> {
        // The conditional update is the compare-and-swap rotation relies on
        let result = sqlx::query("UPDATE refresh_tokens SET is_revoked = TRUE WHERE jti = ? AND is_revoked = FALSE")
            .bind(jti)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to revoke token"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_token_family(&self, family: Uuid) -> Result<usize, DomainError> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET is_revoked = TRUE WHERE family = ? AND is_revoked = FALSE")
                .bind(family.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to revoke token family"))?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete_expired_tokens(&self) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to delete expired refresh tokens"))?;

        Ok(result.rows_affected() as usize)
    }
}
