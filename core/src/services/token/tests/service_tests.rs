//! Unit tests for token issue, rotation and revocation

use std::sync::Arc;

use chrono::{Duration, Utc};

use cm_shared::config::JwtConfig;

use crate::domain::entities::token::{Claims, TokenType};
use crate::domain::entities::user::{User, UserRole};
use crate::errors::{DomainError, TokenError};
use crate::repositories::{InMemoryStore, TokenRepository};
use crate::services::token::{hash_token, TokenService};

fn setup() -> (Arc<InMemoryStore>, TokenService) {
    let store = Arc::new(InMemoryStore::new());
    let service = TokenService::new(store.clone(), JwtConfig::new("test-secret"));
    (store, service)
}

fn student() -> User {
    User::new("student@uni.edu", "h".to_string(), UserRole::Student, "Uni")
}

fn token_error(result: Result<impl std::fmt::Debug, DomainError>) -> TokenError {
    match result {
        Err(DomainError::Token(error)) => error,
        other => panic!("expected token error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_issued_pair_verifies() {
    let (store, service) = setup();
    let user = student();
    let pair = service.issue_tokens(&user).await.unwrap();

    assert_ne!(pair.access_token, pair.refresh_token);
    assert_eq!(pair.token_type, "Bearer");

    let claims = service.verify_access_token(&pair.access_token).unwrap();
    assert_eq!(claims.user_id().unwrap(), user.id);
    assert_eq!(claims.role, Some(UserRole::Student));

    let record = service.verify_refresh_token(&pair.refresh_token).await.unwrap();
    assert_eq!(record.user_id, user.id);
    assert_eq!(record.token_hash, hash_token(&pair.refresh_token));
    assert!(store.find_refresh_token(&record.jti).await.unwrap().is_some());
}

#[tokio::test]
async fn test_token_types_are_not_interchangeable() {
    let (_, service) = setup();
    let pair = service.issue_tokens(&student()).await.unwrap();

    assert_eq!(
        token_error(service.verify_access_token(&pair.refresh_token)),
        TokenError::WrongTokenType
    );
    assert_eq!(
        token_error(service.verify_refresh_token(&pair.access_token).await),
        TokenError::WrongTokenType
    );
}

#[tokio::test]
async fn test_tampered_and_foreign_tokens_rejected() {
    let (_, service) = setup();
    let pair = service.issue_tokens(&student()).await.unwrap();

    let mut tampered = pair.access_token.clone();
    tampered.push('x');
    assert_eq!(
        token_error(service.verify_access_token(&tampered)),
        TokenError::InvalidTokenFormat
    );

    let other = TokenService::new(Arc::new(InMemoryStore::new()), JwtConfig::new("other-secret"));
    assert_eq!(
        token_error(other.verify_access_token(&pair.access_token)),
        TokenError::InvalidTokenFormat
    );
    assert_eq!(
        token_error(service.verify_token("not-a-jwt").await),
        TokenError::InvalidTokenFormat
    );
}

#[tokio::test]
async fn test_expired_access_token() {
    let (_, service) = setup();
    let mut claims = Claims::new_access_token(&student(), service.config(), Utc::now() - Duration::hours(2));
    claims.nbf = claims.iat;
    let token = service.encode_jwt(&claims).unwrap();

    assert_eq!(
        token_error(service.verify_access_token(&token)),
        TokenError::TokenExpired
    );
}

#[tokio::test]
async fn test_rotation_keeps_family_and_revokes_old() {
    let (_, service) = setup();
    let user = student();
    let pair = service.issue_tokens(&user).await.unwrap();

    let record = service.refresh_candidate(&pair.refresh_token).await.unwrap();
    let rotated = service.rotate(&record, &user).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    let new_record = service.verify_refresh_token(&rotated.refresh_token).await.unwrap();
    assert_eq!(new_record.family, record.family);
    assert_eq!(
        token_error(service.verify_refresh_token(&pair.refresh_token).await),
        TokenError::TokenRevoked
    );
}

#[tokio::test]
async fn test_reuse_revokes_whole_family() {
    let (_, service) = setup();
    let user = student();
    let pair = service.issue_tokens(&user).await.unwrap();
    let record = service.refresh_candidate(&pair.refresh_token).await.unwrap();
    let rotated = service.rotate(&record, &user).await.unwrap();

    // Replaying the first token burns the chain
    assert_eq!(
        token_error(service.refresh_candidate(&pair.refresh_token).await),
        TokenError::TokenRevoked
    );
    assert_eq!(
        token_error(service.verify_refresh_token(&rotated.refresh_token).await),
        TokenError::TokenRevoked
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_single_winner() {
    let (_, service) = setup();
    let service = Arc::new(service);
    let user = student();
    let pair = service.issue_tokens(&user).await.unwrap();
    let record = service.refresh_candidate(&pair.refresh_token).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            let record = record.clone();
            let user = user.clone();
            tokio::spawn(async move { service.rotate(&record, &user).await })
        })
        .collect();
    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn test_blacklisted_refresh_token_cannot_rotate() {
    let (_, service) = setup();
    let pair = service.issue_tokens(&student()).await.unwrap();

    service.blacklist_refresh_token(&pair.refresh_token).await.unwrap();
    assert_eq!(
        token_error(service.blacklist_refresh_token(&pair.refresh_token).await),
        TokenError::TokenRevoked
    );
    assert_eq!(
        token_error(service.refresh_candidate(&pair.refresh_token).await),
        TokenError::TokenRevoked
    );
    // Access tokens are independent of the refresh row
    assert!(service.verify_access_token(&pair.access_token).is_ok());
}

#[tokio::test]
async fn test_access_token_outlives_family_revocation() {
    let (store, service) = setup();
    let pair = service.issue_tokens(&student()).await.unwrap();
    let record = service.verify_refresh_token(&pair.refresh_token).await.unwrap();

    store.revoke_token_family(record.family).await.unwrap();

    let claims = service.verify_token(&pair.access_token).await.unwrap();
    assert_eq!(claims.token_type, TokenType::Access);
    assert_eq!(
        token_error(service.verify_token(&pair.refresh_token).await),
        TokenError::TokenRevoked
    );
}

#[tokio::test]
async fn test_purge_keeps_live_tokens() {
    let (_, service) = setup();
    let pair = service.issue_tokens(&student()).await.unwrap();

    assert_eq!(service.purge_expired().await.unwrap(), 0);
    assert!(service.verify_refresh_token(&pair.refresh_token).await.is_ok());
}
