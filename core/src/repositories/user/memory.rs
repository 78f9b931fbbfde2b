use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::entities::user::User;
use crate::errors::DomainError;
use crate::repositories::memory::InMemoryStore;

use super::trait_::{duplicate_email_error, UserRepository};

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let email = email.trim().to_lowercase();
        Ok(self.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut tables = self.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(duplicate_email_error());
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, DomainError> {
        let mut tables = self.write().await;
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| DomainError::not_found("User"))?;
        *stored = user.clone();
        Ok(user)
    }

    async fn list_batch(&self, offset: u64, limit: u64) -> Result<Vec<User>, DomainError> {
        let tables = self.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update_ratings(
        &self,
        id: Uuid,
        as_provider: Decimal,
        as_student: Decimal,
    ) -> Result<(), DomainError> {
        let mut tables = self.write().await;
        let user = tables.users.get_mut(&id).ok_or_else(|| DomainError::not_found("User"))?;
        user.avg_rating_as_provider = as_provider;
        user.avg_rating_as_student = as_student;
        user.updated_at = Utc::now();
        Ok(())
    }
}
