//! Services shared by every worker

use std::sync::Arc;

use cm_core::services::{
    AuthService, AuthServiceConfig, BookingService, CatalogService, FurnitureService, MediaStorage,
    RateLimiter, ReviewService, TokenService,
};
use cm_infra::Repositories;
use cm_shared::config::{AppConfig, MediaConfig};

/// Application state handed to handlers through `web::Data`
pub struct AppState {
    pub auth: AuthService,
    pub catalog: CatalogService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
    pub furniture: FurnitureService,
    pub repositories: Repositories,
    pub media: MediaConfig,
    /// Peers whose forwarding headers are believed
    pub trusted_proxies: Vec<String>,
}

impl AppState {
    /// Wire every service over the chosen backends
    pub fn new(
        config: &AppConfig,
        repositories: Repositories,
        rate_limiter: Arc<dyn RateLimiter>,
        media_storage: Arc<dyn MediaStorage>,
    ) -> Self {
        Self::with_auth_config(
            config,
            AuthServiceConfig::from_app_config(config),
            repositories,
            rate_limiter,
            media_storage,
        )
    }

    pub fn with_auth_config(
        config: &AppConfig,
        auth_config: AuthServiceConfig,
        repositories: Repositories,
        rate_limiter: Arc<dyn RateLimiter>,
        media_storage: Arc<dyn MediaStorage>,
    ) -> Self {
        let repos = &repositories;
        let tokens = Arc::new(TokenService::new(repos.tokens.clone(), config.auth.jwt.clone()));

        Self {
            auth: AuthService::new(
                repos.users.clone(),
                tokens,
                rate_limiter,
                media_storage.clone(),
                auth_config,
            ),
            catalog: CatalogService::new(repos.services.clone(), repos.users.clone(), repos.reviews.clone()),
            bookings: BookingService::new(repos.bookings.clone(), repos.services.clone(), repos.users.clone()),
            reviews: ReviewService::new(
                repos.reviews.clone(),
                repos.bookings.clone(),
                repos.services.clone(),
                repos.users.clone(),
            ),
            furniture: FurnitureService::new(
                repos.furniture.clone(),
                media_storage,
                config.media.max_images_per_item,
            ),
            media: config.media.clone(),
            trusted_proxies: config.server.trusted_proxies.clone(),
            repositories,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        self.auth.token_service()
    }
}
