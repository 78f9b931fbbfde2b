//! Unit tests for authentication service

use std::sync::Arc;

use cm_shared::config::JwtConfig;

use crate::domain::entities::user::{User, UserRole};
use crate::errors::{AuthError, DomainError, TokenError};
use crate::repositories::{InMemoryStore, UserRepository};
use crate::services::auth::{AuthService, AuthServiceConfig, ProfileUpdate, Registration};
use crate::services::media::testing::{png, MemoryMediaStorage};
use crate::services::media::ImageUpload;
use crate::services::token::TokenService;

use super::mocks::MockRateLimiter;

const CLIENT: &str = "203.0.113.7";
const PASSWORD: &str = "movingday42";

struct Harness {
    store: Arc<InMemoryStore>,
    limiter: Arc<MockRateLimiter>,
    media: Arc<MemoryMediaStorage>,
    service: Arc<AuthService>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let limiter = MockRateLimiter::new();
    let media = Arc::new(MemoryMediaStorage::default());
    let tokens = Arc::new(TokenService::new(store.clone(), JwtConfig::new("test-secret")));
    let service = Arc::new(AuthService::new(
        store.clone(),
        tokens,
        limiter.clone(),
        media.clone(),
        AuthServiceConfig::for_tests(),
    ));
    Harness {
        store,
        limiter,
        media,
        service,
    }
}

fn registration(email: &str, role: UserRole) -> Registration {
    Registration {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        password_confirm: PASSWORD.to_string(),
        role,
        phone_number: None,
        university_name: "State University".to_string(),
    }
}

fn validation_fields(err: DomainError) -> Vec<String> {
    match err {
        DomainError::Validation(errors) => errors.errors().iter().map(|e| e.field.clone()).collect(),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_register_normalizes_and_hashes() {
    let h = harness();
    let user = h
        .service
        .register(registration("  New.Student@Uni.EDU ", UserRole::Student))
        .await
        .unwrap();

    assert_eq!(user.email, "new.student@uni.edu");
    assert_eq!(user.role, UserRole::Student);
    assert!(!user.is_verified);
    assert_ne!(user.password_hash, PASSWORD);
    assert!(bcrypt::verify(PASSWORD, &user.password_hash).unwrap());
}

#[tokio::test]
async fn test_register_reports_every_field() {
    let h = harness();
    let mut form = registration("not-an-email", UserRole::Provider);
    form.password = "12345678".to_string();
    form.password_confirm = "different1".to_string();
    form.phone_number = Some("123".to_string());

    let fields = validation_fields(h.service.register(form).await.unwrap_err());
    for field in ["password", "password_confirm", "email", "phone_number"] {
        assert!(fields.iter().any(|f| f == field), "missing {}", field);
    }
}

#[tokio::test]
async fn test_register_duplicate_email_case_insensitive() {
    let h = harness();
    h.service
        .register(registration("dup@uni.edu", UserRole::Student))
        .await
        .unwrap();
    let fields = validation_fields(
        h.service
            .register(registration("DUP@uni.edu", UserRole::Provider))
            .await
            .unwrap_err(),
    );
    assert_eq!(fields, vec!["email".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_single_account() {
    let h = harness();
    let a = {
        let service = h.service.clone();
        tokio::spawn(async move { service.register(registration("race@uni.edu", UserRole::Student)).await })
    };
    let b = {
        let service = h.service.clone();
        tokio::spawn(async move { service.register(registration("race@uni.edu", UserRole::Student)).await })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(DomainError::Validation(ref e)) if e.has_field("email")));
}

#[tokio::test]
async fn test_login_returns_user_and_tokens() {
    let h = harness();
    h.service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();

    let response = h.service.login("Student@Uni.edu", PASSWORD, CLIENT).await.unwrap();
    assert_eq!(response.user.email, "student@uni.edu");
    assert!(response.user.last_login_at.is_some());

    let user = h.service.authenticate(&response.tokens.access_token).await.unwrap();
    assert_eq!(user.id, response.user.id);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let h = harness();
    let user = h
        .service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();

    let unknown = h.service.login("ghost@uni.edu", PASSWORD, CLIENT).await.unwrap_err();
    let wrong = h.service.login("student@uni.edu", "wrongpass1", CLIENT).await.unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(matches!(wrong, DomainError::Auth(AuthError::InvalidCredentials)));

    let mut inactive = user;
    inactive.deactivate();
    UserRepository::update(h.store.as_ref(), inactive).await.unwrap();
    let err = h.service.login("student@uni.edu", PASSWORD, CLIENT).await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_login_rate_limited_before_credentials() {
    let h = harness();
    h.service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();

    for _ in 0..5 {
        let err = h.service.login("student@uni.edu", "wrongpass1", CLIENT).await.unwrap_err();
        assert!(matches!(err, DomainError::Auth(AuthError::InvalidCredentials)));
    }
    // Correct password, but the window is spent
    let err = h.service.login("student@uni.edu", PASSWORD, CLIENT).await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::RateLimitExceeded { .. })));

    // Other clients are counted separately
    assert!(h.service.login("student@uni.edu", PASSWORD, "198.51.100.1").await.is_ok());
}

#[tokio::test]
async fn test_rate_limiter_outage_fails_open() {
    let h = harness();
    h.service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();
    h.limiter.set_unavailable();

    for _ in 0..7 {
        assert!(h.service.login("student@uni.edu", PASSWORD, CLIENT).await.is_ok());
    }
    assert_eq!(h.limiter.total_hits(), 0);
}

#[tokio::test]
async fn test_refresh_rotates_and_is_rate_limited() {
    let h = harness();
    h.service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();
    let mut tokens = h.service.obtain_token("student@uni.edu", PASSWORD, CLIENT).await.unwrap();

    for _ in 0..10 {
        let next = h.service.refresh(&tokens.refresh_token, CLIENT).await.unwrap();
        assert_ne!(next.refresh_token, tokens.refresh_token);
        tokens = next;
    }
    let err = h.service.refresh(&tokens.refresh_token, CLIENT).await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::RateLimitExceeded { .. })));
}

#[tokio::test]
async fn test_logout_blocks_refresh() {
    let h = harness();
    h.service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();
    let tokens = h.service.obtain_token("student@uni.edu", PASSWORD, CLIENT).await.unwrap();

    h.service.logout(&tokens.refresh_token).await.unwrap();
    let err = h.service.refresh(&tokens.refresh_token, CLIENT).await.unwrap_err();
    assert!(matches!(err, DomainError::Token(TokenError::TokenRevoked)));

    // Logging out with an access token is refused
    let err = h.service.logout(&tokens.access_token).await.unwrap_err();
    assert!(matches!(err, DomainError::Token(TokenError::WrongTokenType)));
    h.service.verify_token(&tokens.access_token).await.unwrap();
}

#[tokio::test]
async fn test_update_profile_replaces_image() {
    let h = harness();
    let user = h
        .service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();

    let first = h
        .service
        .update_profile(
            user.id,
            ProfileUpdate {
                profile_image: Some(ImageUpload::new(Some("me.png".to_string()), png(128))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let first_path = first.profile_image.clone().unwrap();
    assert!(first_path.starts_with(&format!("profile_images/{}/", user.id)));

    let second = h
        .service
        .update_profile(
            user.id,
            ProfileUpdate {
                phone_number: Some("+14155552671".to_string()),
                profile_image: Some(ImageUpload::new(None, png(64))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.phone_number.as_deref(), Some("+14155552671"));
    let files = h.media.files.lock().unwrap();
    assert_eq!(files.len(), 1);
    assert!(!files.contains_key(&first_path));
}

#[tokio::test]
async fn test_update_profile_rejects_bad_input_without_storing() {
    let h = harness();
    let user = h
        .service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();

    let err = h
        .service
        .update_profile(
            user.id,
            ProfileUpdate {
                phone_number: Some("123".to_string()),
                profile_image: Some(ImageUpload::new(Some("me.png".to_string()), png(32))),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["phone_number".to_string()]);
    assert!(h.media.files.lock().unwrap().is_empty());

    let err = h
        .service
        .update_profile(
            user.id,
            ProfileUpdate {
                profile_image: Some(ImageUpload::new(Some("big.png".to_string()), png(6 * 1024 * 1024))),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["profile_image".to_string()]);
}

#[tokio::test]
async fn test_verify_provider_staff_only() {
    let h = harness();
    let provider = h
        .service
        .register(registration("mover@uni.edu", UserRole::Provider))
        .await
        .unwrap();
    let student = h
        .service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();
    let mut staff = User::new("staff@uni.edu", "h".to_string(), UserRole::Student, "Uni");
    staff.is_staff = true;

    let err = h.service.verify_provider(&student, provider.id).await.unwrap_err();
    assert!(matches!(err, DomainError::PermissionDenied { .. }));

    let verified = h.service.verify_provider(&staff, provider.id).await.unwrap();
    assert!(verified.is_verified);
    assert!(h.service.verify_provider(&staff, provider.id).await.unwrap().is_verified);

    let err = h.service.verify_provider(&staff, student.id).await.unwrap_err();
    assert!(matches!(err, DomainError::RoleMismatch { .. }));

    let err = h.service.verify_provider(&staff, uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_authenticate_rejects_deactivated_account() {
    let h = harness();
    h.service
        .register(registration("student@uni.edu", UserRole::Student))
        .await
        .unwrap();
    let response = h.service.login("student@uni.edu", PASSWORD, CLIENT).await.unwrap();

    let mut user = response.user;
    user.deactivate();
    UserRepository::update(h.store.as_ref(), user).await.unwrap();

    let err = h.service.authenticate(&response.tokens.access_token).await.unwrap_err();
    assert!(matches!(err, DomainError::Auth(AuthError::AccountInactive)));
}
