use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::entities::token::RefreshToken;
use crate::errors::DomainError;
use crate::repositories::memory::InMemoryStore;

use super::trait_::TokenRepository;

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn save_refresh_token(&self, token: RefreshToken) -> Result<RefreshToken, DomainError> {
        let mut tables = self.write().await;
        if tables.refresh_tokens.contains_key(&token.jti) {
            return Err(DomainError::Conflict {
                message: "Token already exists".to_string(),
            });
        }
        tables.refresh_tokens.insert(token.jti.clone(), token.clone());
        Ok(token)
    }

    async fn find_refresh_token(&self, jti: &str) -> Result<Option<RefreshToken>, DomainError> {
        Ok(self.read().await.refresh_tokens.get(jti).cloned())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> Result<bool, DomainError> {
        let mut tables = self.write().await;
        match tables.refresh_tokens.get_mut(jti) {
            Some(token) if !token.is_revoked => {
                token.is_revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_token_family(&self, family: Uuid) -> Result<usize, DomainError> {
        let mut tables = self.write().await;
        let mut count = 0;
        for token in tables.refresh_tokens.values_mut() {
            if token.family == family && !token.is_revoked {
                token.is_revoked = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_expired_tokens(&self) -> Result<usize, DomainError> {
        let now = Utc::now();
        let mut tables = self.write().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, token| token.expires_at > now);
        Ok(before - tables.refresh_tokens.len())
    }
}
