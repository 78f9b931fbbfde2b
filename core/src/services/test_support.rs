//! Fixtures shared by the service tests

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use crate::domain::entities::booking::{Booking, BookingStatus, NewBooking};
use crate::domain::entities::moving_service::MovingService;
use crate::domain::entities::user::{User, UserRole};
use crate::repositories::{BookingRepository, InMemoryStore, MovingServiceRepository, UserRepository};

pub async fn user(store: &InMemoryStore, email: &str, role: UserRole) -> User {
    UserRepository::create(store, User::new(email, "h".to_string(), role, "State University"))
        .await
        .unwrap()
}

pub async fn verified_provider(store: &InMemoryStore, email: &str) -> User {
    let mut provider = user(store, email, UserRole::Provider).await;
    provider.is_verified = true;
    UserRepository::update(store, provider).await.unwrap()
}

pub async fn staff(store: &InMemoryStore) -> User {
    let mut staff = user(store, "staff@uni.edu", UserRole::Student).await;
    staff.is_staff = true;
    UserRepository::update(store, staff).await.unwrap()
}

pub async fn moving_service(store: &InMemoryStore, provider: &User) -> MovingService {
    MovingServiceRepository::create(
        store,
        MovingService::new(provider, "Campus Movers", "Two movers and a van", dec!(100)).unwrap(),
    )
    .await
    .unwrap()
}

pub fn new_booking(service: &MovingService, hours_ahead: i64) -> NewBooking {
    NewBooking {
        service_id: service.id,
        booking_date: Utc::now() + Duration::hours(hours_ahead),
        pickup_location: "North Hall".to_string(),
        dropoff_location: "Elm Street 4".to_string(),
        total_price: None,
    }
}

/// A booking stored directly in `status`, bypassing the date rules
pub async fn booking_in_status(
    store: &Arc<InMemoryStore>,
    student: &User,
    provider: &User,
    service: &MovingService,
    hours_ahead: i64,
    status: BookingStatus,
) -> Booking {
    let mut booking = Booking::new(student, provider, service, new_booking(service, 48), Utc::now()).unwrap();
    booking.booking_date = Utc::now() + Duration::hours(hours_ahead);
    booking.status = status;
    BookingRepository::create(store.as_ref(), booking).await.unwrap()
}
