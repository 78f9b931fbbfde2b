//! Fixtures for the HTTP tests: an in-memory backend per test

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{body::MessageBody, dev::ServiceResponse, http::StatusCode, test, web};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;

use cm_api::AppState;
use cm_core::domain::entities::booking::{Booking, BookingStatus, NewBooking};
use cm_core::domain::entities::moving_service::MovingService;
use cm_core::domain::entities::user::{User, UserRole};
use cm_core::repositories::{BookingRepository, MovingServiceRepository, UserRepository};
use cm_core::services::AuthServiceConfig;
use cm_infra::services::auth::InMemoryRateLimiter;
use cm_infra::storage::FileSystemMediaStorage;
use cm_infra::Repositories;
use cm_shared::config::AppConfig;

pub const PASSWORD: &str = "moving2024";

pub struct TestContext {
    pub state: web::Data<AppState>,
    pub config: AppConfig,
}

/// Fresh state over the in-process store, media under a unique temp dir
pub fn context() -> TestContext {
    context_with(AuthServiceConfig::for_tests())
}

pub fn context_with(auth_config: AuthServiceConfig) -> TestContext {
    let mut config = AppConfig::development();
    config.media.root = std::env::temp_dir().join(format!("cm-api-test-{}", uuid::Uuid::new_v4()));

    let state = AppState::with_auth_config(
        &config,
        auth_config,
        Repositories::in_memory(),
        Arc::new(InMemoryRateLimiter::new()),
        Arc::new(FileSystemMediaStorage::new(config.media.root.clone())),
    );
    TestContext {
        state: web::Data::new(state),
        config,
    }
}

impl TestContext {
    pub fn repositories(&self) -> &Repositories {
        &self.state.repositories
    }

    /// Stored account that never logs in with a password
    pub async fn user(&self, email: &str, role: UserRole) -> User {
        let user = User::new(email, "unused-hash".to_string(), role, "State University");
        self.repositories().users.create(user).await.unwrap()
    }

    pub async fn verified_provider(&self, email: &str) -> User {
        let mut provider = self.user(email, UserRole::Provider).await;
        provider.is_verified = true;
        self.repositories().users.update(provider).await.unwrap()
    }

    pub async fn staff(&self) -> User {
        let mut staff = self.user("staff@uni.edu", UserRole::Student).await;
        staff.is_staff = true;
        self.repositories().users.update(staff).await.unwrap()
    }

    /// Bearer header value for `user`
    pub async fn bearer(&self, user: &User) -> String {
        let pair = self.state.tokens().issue_tokens(user).await.unwrap();
        format!("Bearer {}", pair.access_token)
    }

    pub async fn moving_service(&self, provider: &User) -> MovingService {
        let service = MovingService::new(provider, "Campus Movers", "Two movers and a van", dec!(120)).unwrap();
        self.repositories().services.create(service).await.unwrap()
    }

    /// A booking stored directly, `hours_ahead` may be negative
    pub async fn booking(
        &self,
        student: &User,
        provider: &User,
        service: &MovingService,
        hours_ahead: i64,
        status: BookingStatus,
    ) -> Booking {
        let input = NewBooking {
            service_id: service.id,
            booking_date: Utc::now() + Duration::hours(48),
            pickup_location: "North Hall".to_string(),
            dropoff_location: "Elm Street 4".to_string(),
            total_price: None,
        };
        let mut booking = Booking::new(student, provider, service, input, Utc::now()).unwrap();
        booking.booking_date = Utc::now() + Duration::hours(hours_ahead);
        booking.status = status;
        self.repositories().bookings.create(booking).await.unwrap()
    }
}

/// Status and decoded JSON body (`Null` when empty)
pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Value) {
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Smallest thing the image sniffer accepts as a PNG, base64 encoded
pub fn png_base64() -> String {
    let mut bytes = vec![0x89u8, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(64, 0);
    STANDARD.encode(bytes)
}
