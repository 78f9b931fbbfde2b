use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::domain::entities::booking::BookingStatus;
use crate::domain::entities::user::UserRole;
use crate::domain::value_objects::query::CalendarQuery;
use crate::errors::DomainError;
use crate::repositories::InMemoryStore;
use crate::services::booking::{BookingService, CalendarDay};
use crate::services::test_support::{moving_service, new_booking, user, verified_provider};

fn query(start: &str, end: &str, provider: Option<String>) -> CalendarQuery {
    CalendarQuery::parse(Some(start), Some(end), provider.as_deref(), None, None).unwrap()
}

#[test]
fn test_slots_keep_two_hour_gap() {
    let date = Utc::now().date_naive();
    let empty = CalendarDay::build(date, Vec::new());
    assert_eq!(empty.available_slots.len(), 11);
    assert_eq!(empty.available_slots.first().map(String::as_str), Some("08:00"));
    assert_eq!(empty.available_slots.last().map(String::as_str), Some("18:00"));
    assert!(!empty.is_fully_booked);
}

#[tokio::test]
async fn test_calendar_lists_every_day_with_free_slots() {
    let store = Arc::new(InMemoryStore::new());
    let service = BookingService::new(store.clone(), store.clone(), store.clone());
    let student = user(&store, "student@uni.edu", UserRole::Student).await;
    let provider = verified_provider(&store, "mover@uni.edu").await;
    let listing = moving_service(&store, &provider).await;

    let day = (Utc::now() + Duration::days(2)).date_naive();
    let mut input = new_booking(&listing, 48);
    input.booking_date = day.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap()).and_utc();
    let booking = service.create(&student, input).await.unwrap();

    let start = day - Duration::days(1);
    let end = day + Duration::days(1);
    let days = service
        .calendar(&query(
            &start.format("%Y-%m-%d").to_string(),
            &end.format("%Y-%m-%d").to_string(),
            Some(provider.id.to_string()),
        ))
        .await
        .unwrap();

    assert_eq!(days.len(), 3);
    assert_eq!(days[1].date, day);
    assert!(days[0].bookings.is_empty());
    assert_eq!(days[0].available_slots.len(), 11);

    let entry = &days[1].bookings[0];
    assert_eq!(entry.id, booking.id);
    assert_eq!(entry.service_name, "Campus Movers");
    assert_eq!(entry.student_email, "student@uni.edu");
    assert_eq!(entry.provider_email, "mover@uni.edu");
    assert_eq!(entry.status, BookingStatus::Pending);
    // 09:00 to 11:00 are within two hours of the 10:00 move
    assert_eq!(
        days[1].available_slots,
        ["08:00", "12:00", "13:00", "14:00", "15:00", "16:00", "17:00", "18:00"]
    );
}

#[tokio::test]
async fn test_calendar_rejects_unknown_provider() {
    let store = Arc::new(InMemoryStore::new());
    let service = BookingService::new(store.clone(), store.clone(), store.clone());
    let student = user(&store, "student@uni.edu", UserRole::Student).await;

    for provider in [Uuid::new_v4(), student.id] {
        let err = service
            .calendar(&query("2030-01-01", "2030-01-02", Some(provider.to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref e) if e.has_field("provider")));
    }
}
