//! Unit tests for booking persistence on the in-process store

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use cm_shared::Pagination;

use crate::domain::entities::booking::{Booking, BookingChanges, BookingStatus, NewBooking};
use crate::domain::entities::moving_service::MovingService;
use crate::domain::entities::user::{User, UserRole};
use crate::domain::value_objects::query::{BookingFilter, CalendarQuery};
use crate::errors::DomainError;
use crate::repositories::booking::BookingRepository;
use crate::repositories::memory::InMemoryStore;
use crate::repositories::moving_service::MovingServiceRepository;
use crate::repositories::user::UserRepository;

struct Fixture {
    store: Arc<InMemoryStore>,
    student: User,
    provider: User,
    service: MovingService,
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let student = UserRepository::create(
        store.as_ref(),
        User::new("s@uni.edu", "h".to_string(), UserRole::Student, "Uni"),
    )
    .await
    .unwrap();
    let provider = UserRepository::create(
        store.as_ref(),
        User::new("p@uni.edu", "h".to_string(), UserRole::Provider, "Uni"),
    )
    .await
    .unwrap();
    let service = MovingServiceRepository::create(
        store.as_ref(),
        MovingService::new(&provider, "Movers", "desc", dec!(100)).unwrap(),
    )
    .await
    .unwrap();
    Fixture {
        store,
        student,
        provider,
        service,
    }
}

impl Fixture {
    fn booking_at(&self, hours_ahead: i64) -> Booking {
        let now = Utc::now();
        Booking::new(
            &self.student,
            &self.provider,
            &self.service,
            NewBooking {
                service_id: self.service.id,
                booking_date: now + Duration::hours(hours_ahead),
                pickup_location: "Dorm".to_string(),
                dropoff_location: "Flat".to_string(),
                total_price: None,
            },
            now,
        )
        .unwrap()
    }
}

#[tokio::test]
async fn test_slot_conflict_within_two_hours() {
    let f = fixture().await;
    BookingRepository::create(f.store.as_ref(), f.booking_at(48)).await.unwrap();

    let err = BookingRepository::create(f.store.as_ref(), f.booking_at(49))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("booking_date")));

    BookingRepository::create(f.store.as_ref(), f.booking_at(51)).await.unwrap();
}

#[tokio::test]
async fn test_cancelled_booking_frees_slot() {
    let f = fixture().await;
    let first = BookingRepository::create(f.store.as_ref(), f.booking_at(48)).await.unwrap();
    f.store
        .transition(first.id, BookingStatus::Cancelled, Utc::now())
        .await
        .unwrap();

    BookingRepository::create(f.store.as_ref(), f.booking_at(48)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_slot_one_winner() {
    let f = fixture().await;
    let candidates: Vec<Booking> = (0..6).map(|_| f.booking_at(72)).collect();

    let handles: Vec<_> = candidates
        .into_iter()
        .map(|booking| {
            let store = f.store.clone();
            tokio::spawn(async move { BookingRepository::create(store.as_ref(), booking).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancellations_apply_once() {
    let f = fixture().await;
    let booking = BookingRepository::create(f.store.as_ref(), f.booking_at(24)).await.unwrap();

    let (a, b) = tokio::join!(
        f.store.transition(booking.id, BookingStatus::Cancelled, Utc::now()),
        f.store.transition(booking.id, BookingStatus::Cancelled, Utc::now()),
    );
    let outcomes = [a, b];
    let applied = outcomes.iter().filter(|r| matches!(r, Ok((_, true)))).count();
    let rejected = outcomes
        .iter()
        .filter(|r| matches!(r, Err(DomainError::Transition(_))))
        .count();
    assert_eq!((applied, rejected), (1, 1));
}

#[tokio::test]
async fn test_rejected_transition_leaves_row() {
    let f = fixture().await;
    let booking = BookingRepository::create(f.store.as_ref(), f.booking_at(24)).await.unwrap();

    let err = f
        .store
        .transition(booking.id, BookingStatus::Completed, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Transition(_)));

    let stored = BookingRepository::find_by_id(f.store.as_ref(), booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
}

#[tokio::test]
async fn test_update_details_rechecks_slot() {
    let f = fixture().await;
    BookingRepository::create(f.store.as_ref(), f.booking_at(48)).await.unwrap();
    let other = BookingRepository::create(f.store.as_ref(), f.booking_at(96)).await.unwrap();

    let err = f
        .store
        .update_details(
            other.id,
            BookingChanges {
                booking_date: Some(Utc::now() + Duration::hours(49)),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let updated = f
        .store
        .update_details(
            other.id,
            BookingChanges {
                pickup_location: Some("Library".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(updated.pickup_location, "Library");
}

#[tokio::test]
async fn test_saves_recheck_party_roles() {
    let f = fixture().await;
    let booking = BookingRepository::create(f.store.as_ref(), f.booking_at(24)).await.unwrap();

    // A row edited behind the service layer no longer holds the student role
    let mut student = f.student.clone();
    student.role = UserRole::Provider;
    UserRepository::update(f.store.as_ref(), student).await.unwrap();

    let err = f
        .store
        .transition(booking.id, BookingStatus::Confirmed, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::RoleMismatch { ref field, .. } if field == "student"));

    let err = f
        .store
        .update_details(
            booking.id,
            BookingChanges {
                pickup_location: Some("Library".to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::RoleMismatch { ref field, .. } if field == "student"));

    let stored = BookingRepository::find_by_id(f.store.as_ref(), booking.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert_eq!(stored.pickup_location, "Dorm");
}

#[tokio::test]
async fn test_list_for_user_filters_and_orders() {
    let f = fixture().await;
    let early = BookingRepository::create(f.store.as_ref(), f.booking_at(24)).await.unwrap();
    let late = BookingRepository::create(f.store.as_ref(), f.booking_at(96)).await.unwrap();
    f.store
        .transition(late.id, BookingStatus::Confirmed, Utc::now())
        .await
        .unwrap();

    let all = f
        .store
        .list_for_user(f.student.id, &BookingFilter::default(), Utc::now(), Pagination::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = all.results.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![late.id, early.id]);

    let pending = BookingFilter::from_query(Some("pending"), None, None, None, None, None);
    let page = f
        .store
        .list_for_user(f.provider.id, &pending, Utc::now(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].id, early.id);

    let stranger = f
        .store
        .list_for_user(Uuid::new_v4(), &BookingFilter::default(), Utc::now(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(stranger.count, 0);
}

#[tokio::test]
async fn test_calendar_range_and_status() {
    let f = fixture().await;
    let first = BookingRepository::create(f.store.as_ref(), f.booking_at(48)).await.unwrap();
    let second = BookingRepository::create(f.store.as_ref(), f.booking_at(24)).await.unwrap();
    let cancelled = BookingRepository::create(f.store.as_ref(), f.booking_at(30)).await.unwrap();
    f.store
        .transition(cancelled.id, BookingStatus::Cancelled, Utc::now())
        .await
        .unwrap();

    let start = (Utc::now() - Duration::days(1)).date_naive().to_string();
    let end = (Utc::now() + Duration::days(5)).date_naive().to_string();
    let query = CalendarQuery::parse(Some(&start), Some(&end), None, None, None).unwrap();
    let ids: Vec<Uuid> = f.store.calendar(&query).await.unwrap().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    let other_service = Uuid::new_v4().to_string();
    let query = CalendarQuery::parse(Some(&start), Some(&end), None, Some(&other_service), None).unwrap();
    assert!(f.store.calendar(&query).await.unwrap().is_empty());

    let query = CalendarQuery::parse(Some(&start), Some(&end), None, None, Some("cancelled")).unwrap();
    assert_eq!(f.store.calendar(&query).await.unwrap()[0].id, cancelled.id);
}
