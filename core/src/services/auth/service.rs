//! Main authentication service implementation

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cm_shared::email::{mask_email, normalize_email};
use cm_shared::phone::mask_phone_number;
use cm_shared::password::validate_password_strength;
use cm_shared::validation::ValidationErrors;

use crate::domain::entities::token::TokenPair;
use crate::domain::entities::user::{ProfileChanges, User, UserRole};
use crate::domain::value_objects::AuthResponse;
use crate::errors::{AuthError, DomainError, TokenError};
use crate::repositories::user::r#trait::duplicate_email_error;
use crate::repositories::UserRepository;
use crate::services::media::{save_image, ImageUpload, MediaStorage, PROFILE_IMAGES};
use crate::services::token::TokenService;

use super::config::AuthServiceConfig;
use super::rate_limiter::{RateLimitAction, RateLimiter};

/// Password compared against when the email is unknown, so both failure
/// paths pay for one bcrypt verification
const DUMMY_PASSWORD: &str = "campus-move-dummy-password";

/// Registration form
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: UserRole,
    pub phone_number: Option<String>,
    pub university_name: String,
}

/// Profile edit form. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub university_name: Option<String>,
    pub profile_image: Option<ImageUpload>,
}

/// Authentication service for accounts, credentials and sessions
pub struct AuthService {
    /// User repository for database operations
    user_repository: Arc<dyn UserRepository>,
    /// Token service for JWT management
    token_service: Arc<TokenService>,
    /// Shared counter store for login/refresh limits
    rate_limiter: Arc<dyn RateLimiter>,
    /// Where profile pictures are written
    media: Arc<dyn MediaStorage>,
    config: AuthServiceConfig,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        token_service: Arc<TokenService>,
        rate_limiter: Arc<dyn RateLimiter>,
        media: Arc<dyn MediaStorage>,
        config: AuthServiceConfig,
    ) -> Self {
        Self {
            user_repository,
            token_service,
            rate_limiter,
            media,
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn token_service(&self) -> &Arc<TokenService> {
        &self.token_service
    }

    /// Register a new account
    ///
    /// Every field problem is reported at once. Of two concurrent
    /// registrations with the same email exactly one succeeds.
    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        let mut errors = ValidationErrors::new();
        errors.merge(validate_password_strength(
            &registration.password,
            self.config.password.min_length,
        ));
        if registration.password != registration.password_confirm {
            errors.add_error("password_confirm", "Password fields didn't match.", "password_mismatch");
        }

        let mut user = User::new(
            &registration.email,
            String::new(),
            registration.role,
            registration.university_name,
        )
        .with_phone_number(registration.phone_number);
        errors.merge(user.validate());
        errors.into_result()?;

        if self.user_repository.find_by_email(&user.email).await?.is_some() {
            return Err(duplicate_email_error());
        }

        user.password_hash = self.hash_password(registration.password).await?;
        let user = self.user_repository.create(user).await?;

        info!(
            user_id = %user.id,
            email = %mask_email(&user.email),
            role = %user.role,
            "User registered"
        );
        Ok(user)
    }

    /// Email/password login returning the account and a new token pair
    ///
    /// The rate limit is enforced before credentials are looked at.
    pub async fn login(&self, email: &str, password: &str, client: &str) -> Result<AuthResponse, DomainError> {
        self.enforce_rate_limit(RateLimitAction::Login, client).await?;
        let user = self.check_credentials(email, password).await?;
        let tokens = self.token_service.issue_tokens(&user).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse::new(user, tokens))
    }

    /// Same checks as [`login`](Self::login), returning only the tokens
    pub async fn obtain_token(&self, email: &str, password: &str, client: &str) -> Result<TokenPair, DomainError> {
        self.login(email, password, client).await.map(|response| response.tokens)
    }

    async fn check_credentials(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let email = normalize_email(email);
        let Some(mut user) = self.user_repository.find_by_email(&email).await? else {
            let dummy = self.dummy_hash().await?;
            let _ = self.verify_password(password, dummy).await;
            debug!(email = %mask_email(&email), "Login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !self.verify_password(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        if !user.is_active {
            warn!(user_id = %user.id, "Login to inactive account");
            return Err(AuthError::InvalidCredentials.into());
        }

        user.record_login();
        self.user_repository.update(user).await
    }

    /// Rotate a refresh token into a new pair
    pub async fn refresh(&self, refresh_token: &str, client: &str) -> Result<TokenPair, DomainError> {
        self.enforce_rate_limit(RateLimitAction::TokenRefresh, client).await?;
        let record = self.token_service.refresh_candidate(refresh_token).await?;
        let user = self
            .user_repository
            .find_by_id(record.user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(DomainError::Token(TokenError::InvalidTokenFormat))?;
        self.token_service.rotate(&record, &user).await
    }

    /// Blacklist the given refresh token. Access tokens stay valid until they
    /// expire.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), DomainError> {
        self.token_service.blacklist_refresh_token(refresh_token).await
    }

    /// Check that a token of either type is valid
    pub async fn verify_token(&self, token: &str) -> Result<(), DomainError> {
        self.token_service.verify_token(token).await.map(|_| ())
    }

    /// Resolve a bearer token to its active account
    pub async fn authenticate(&self, access_token: &str) -> Result<User, DomainError> {
        let claims = self.token_service.verify_access_token(access_token)?;
        let user_id = claims
            .user_id()
            .map_err(|_| DomainError::Token(TokenError::InvalidTokenFormat))?;
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidTokenFormat))?;
        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }
        Ok(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))
    }

    /// Edit the caller's own profile, optionally replacing the picture
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<User, DomainError> {
        let mut user = self.get_profile(user_id).await?;
        let previous_image = user.profile_image.clone();

        let stored_image = match &update.profile_image {
            Some(upload) => Some(
                save_image(self.media.as_ref(), "profile_image", PROFILE_IMAGES, user.id, upload).await?,
            ),
            None => None,
        };

        let changes = ProfileChanges {
            phone_number: update.phone_number,
            university_name: update.university_name,
            profile_image: stored_image.clone(),
        };
        if let Err(errors) = user.apply_profile_changes(changes) {
            if let Some(path) = &stored_image {
                self.discard_image(path).await;
            }
            return Err(errors.into());
        }

        let user = self.user_repository.update(user).await?;
        if let (Some(old), Some(_)) = (previous_image, stored_image) {
            self.discard_image(&old).await;
        }
        info!(
            user_id = %user.id,
            phone = ?user.phone_number.as_deref().map(mask_phone_number),
            "Profile updated"
        );
        Ok(user)
    }

    /// Mark a provider as verified. Staff only; repeating it is harmless.
    pub async fn verify_provider(&self, actor: &User, user_id: Uuid) -> Result<User, DomainError> {
        if !actor.is_staff {
            return Err(DomainError::permission_denied(
                "Only staff members can verify providers",
            ));
        }
        let mut user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User"))?;

        if !user.verify_provider()? {
            return Ok(user);
        }
        let user = self.user_repository.update(user).await?;
        info!(user_id = %user.id, staff_id = %actor.id, "Provider verified");
        Ok(user)
    }

    async fn enforce_rate_limit(&self, action: RateLimitAction, client: &str) -> Result<(), DomainError> {
        let limits = &self.config.rate_limit;
        if !limits.enabled {
            return Ok(());
        }
        let limit = match action {
            RateLimitAction::Login => limits.login,
            RateLimitAction::TokenRefresh => limits.refresh,
        };

        match self.rate_limiter.hit(action, client, limit).await {
            Ok(decision) if decision.allowed => Ok(()),
            Ok(decision) => {
                warn!(
                    action = action.as_str(),
                    client = %client,
                    count = decision.count,
                    "Rate limit exceeded"
                );
                Err(AuthError::RateLimitExceeded {
                    retry_after_seconds: decision.retry_after_seconds,
                }
                .into())
            }
            Err(e) => {
                warn!(error = %e, action = action.as_str(), "Rate limiter unavailable, request allowed");
                Ok(())
            }
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, DomainError> {
        let cost = self.config.password.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(DomainError::internal)?
            .map_err(DomainError::internal)
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(DomainError::internal)?
            .map_err(DomainError::internal)
    }

    async fn dummy_hash(&self) -> Result<&str, DomainError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD.to_string()))
            .await
            .map(String::as_str)
    }

    async fn discard_image(&self, path: &str) {
        if let Err(e) = self.media.remove(path).await {
            warn!(error = %e, path = %path, "Failed to remove profile image");
        }
    }
}
