//! Selection of the configured backends
//!
//! Everything is handed out as trait objects so the API layer never names a
//! concrete store.

use std::sync::Arc;

use cm_core::repositories::{
    BookingRepository, FurnitureRepository, InMemoryStore, MovingServiceRepository, ReviewRepository,
    TokenRepository, UserRepository,
};
use cm_core::services::{MediaStorage, RateLimiter};
use cm_shared::config::{AppConfig, DatabaseConfig, RateLimitBackend, StorageBackend};

use crate::services::auth::InMemoryRateLimiter;
use crate::storage::FileSystemMediaStorage;
use crate::InfrastructureError;

#[cfg(feature = "mysql")]
use crate::database::{
    DatabasePool, MySqlBookingRepository, MySqlFurnitureRepository, MySqlMovingServiceRepository,
    MySqlReviewRepository, MySqlTokenRepository, MySqlUserRepository,
};

/// One handle per repository trait, all backed by the same store
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub services: Arc<dyn MovingServiceRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub furniture: Arc<dyn FurnitureRepository>,
    #[cfg(feature = "mysql")]
    pool: Option<DatabasePool>,
}

impl Repositories {
    /// Every repository over one shared in-process store
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }

    pub fn from_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            tokens: store.clone(),
            services: store.clone(),
            bookings: store.clone(),
            reviews: store.clone(),
            furniture: store,
            #[cfg(feature = "mysql")]
            pool: None,
        }
    }

    #[cfg(feature = "mysql")]
    pub fn mysql(pool: DatabasePool) -> Self {
        let conn = pool.pool().clone();
        Self {
            users: Arc::new(MySqlUserRepository::new(conn.clone())),
            tokens: Arc::new(MySqlTokenRepository::new(conn.clone())),
            services: Arc::new(MySqlMovingServiceRepository::new(conn.clone())),
            bookings: Arc::new(MySqlBookingRepository::new(conn.clone())),
            reviews: Arc::new(MySqlReviewRepository::new(conn.clone())),
            furniture: Arc::new(MySqlFurnitureRepository::new(conn)),
            pool: Some(pool),
        }
    }

    /// Build the backend named in `config`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Ok(Self::in_memory())
            }
            #[cfg(feature = "mysql")]
            StorageBackend::Mysql => Ok(Self::mysql(DatabasePool::connect(config).await?)),
            #[cfg(not(feature = "mysql"))]
            StorageBackend::Mysql => Err(InfrastructureError::Config(
                "MySQL support was not compiled in".to_string(),
            )),
        }
    }

    /// Whether the backing store answers
    pub async fn health_check(&self) -> bool {
        #[cfg(feature = "mysql")]
        if let Some(pool) = &self.pool {
            return pool.ping().await.is_ok();
        }
        true
    }

    /// Release pooled connections on shutdown
    pub async fn close(&self) {
        #[cfg(feature = "mysql")]
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

/// Counter store for the login and refresh limits
pub async fn rate_limiter(config: &AppConfig) -> Result<Arc<dyn RateLimiter>, InfrastructureError> {
    match config.rate_limit.backend {
        RateLimitBackend::Memory => Ok(Arc::new(InMemoryRateLimiter::new())),
        #[cfg(feature = "redis-cache")]
        RateLimitBackend::Redis => {
            let client = crate::cache::RedisClient::connect(config.cache.clone()).await?;
            Ok(Arc::new(crate::services::auth::RedisRateLimiter::new(Arc::new(client))))
        }
        #[cfg(not(feature = "redis-cache"))]
        RateLimitBackend::Redis => Err(InfrastructureError::Config(
            "Redis support was not compiled in".to_string(),
        )),
    }
}

/// Media storage rooted at the configured directory
pub fn media_storage(config: &AppConfig) -> Arc<dyn MediaStorage> {
    Arc::new(FileSystemMediaStorage::new(config.media.root.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::domain::entities::user::{User, UserRole};

    #[tokio::test]
    async fn test_in_memory_repositories_share_one_store() {
        let repos = Repositories::connect(&DatabaseConfig::default()).await.unwrap();
        let user = User::new("shared@uni.edu", "hash".to_string(), UserRole::Student, "Uni");
        repos.users.create(user.clone()).await.unwrap();

        let again = repos.clone();
        assert!(again.users.find_by_id(user.id).await.unwrap().is_some());
        assert!(again.users.find_by_email("SHARED@uni.edu").await.unwrap().is_some());
        assert!(repos.health_check().await);
    }

    #[tokio::test]
    async fn test_memory_rate_limiter_is_default() {
        let config = AppConfig::development();
        let limiter = rate_limiter(&config).await.unwrap();
        let decision = limiter
            .hit(cm_core::services::RateLimitAction::Login, "127.0.0.1", config.rate_limit.login)
            .await
            .unwrap();
        assert!(decision.allowed);
    }
}
