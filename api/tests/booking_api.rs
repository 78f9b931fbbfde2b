//! Booking endpoints: creation rules, status changes and the calendar

mod common;

use actix_web::{http::header, test};
use chrono::{Duration, Utc};
use serde_json::json;

use cm_api::create_app;
use cm_core::domain::entities::booking::BookingStatus;
use cm_core::domain::entities::user::UserRole;

use common::{context, read_json};

fn booking_body(service_id: uuid::Uuid, hours_ahead: i64) -> serde_json::Value {
    json!({
        "service_id": service_id,
        "booking_date": (Utc::now() + Duration::hours(hours_ahead)).to_rfc3339(),
        "pickup_location": "North Hall",
        "dropoff_location": "Elm Street 4"
    })
}

#[actix_web::test]
async fn test_student_books_service_of_provider() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;

    let req = test::TestRequest::post()
        .uri("/api/bookings/")
        .insert_header((header::AUTHORIZATION, ctx.bearer(&student).await))
        .set_json(booking_body(service.id, 48))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["student_id"], json!(student.id));
    assert_eq!(body["provider_id"], json!(provider.id));
}

#[actix_web::test]
async fn test_provider_cannot_book() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;

    let req = test::TestRequest::post()
        .uri("/api/bookings/")
        .insert_header((header::AUTHORIZATION, ctx.bearer(&provider).await))
        .set_json(booking_body(service.id, 48))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "ROLE_MISMATCH");
    assert_eq!(body["details"]["field"], "student");
}

#[actix_web::test]
async fn test_slots_within_two_hours_conflict() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;
    let bearer = ctx.bearer(&student).await;

    for (hours, expected) in [(48, 201), (49, 400), (51, 201)] {
        let req = test::TestRequest::post()
            .uri("/api/bookings/")
            .insert_header((header::AUTHORIZATION, bearer.clone()))
            .set_json(booking_body(service.id, hours))
            .to_request();
        let (status, body) = read_json(test::call_service(&app, req).await).await;
        assert_eq!(status, expected, "booking {} hours ahead", hours);
        if expected == 400 {
            assert!(body["details"]["fields"]["booking_date"].is_array());
        }
    }
}

#[actix_web::test]
async fn test_status_flow_and_permissions() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;
    let booking = ctx.booking(&student, &provider, &service, 48, BookingStatus::Pending).await;
    let uri = format!("/api/bookings/{}/status/", booking.id);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, ctx.bearer(&student).await))
        .set_json(json!({ "status": "confirmed" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, ctx.bearer(&provider).await))
        .set_json(json!({ "status": "confirmed" }))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "confirmed");

    // Still two days away
    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, ctx.bearer(&provider).await))
        .set_json(json!({ "status": "completed" }))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "INVALID_TRANSITION");
    assert_eq!(body["details"]["from"], "confirmed");
    assert_eq!(body["details"]["to"], "completed");

    let req = test::TestRequest::patch()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, ctx.bearer(&student).await))
        .set_json(json!({ "status": "cancelled" }))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "cancelled");
}

#[actix_web::test]
async fn test_unknown_status_is_a_field_error() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;
    let booking = ctx.booking(&student, &provider, &service, 48, BookingStatus::Pending).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/status/", booking.id))
        .insert_header((header::AUTHORIZATION, ctx.bearer(&provider).await))
        .set_json(json!({ "status": "shipped" }))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 400);
    assert!(body["details"]["fields"]["status"].is_array());
}

#[actix_web::test]
async fn test_terminal_booking_is_locked() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;
    let booking = ctx.booking(&student, &provider, &service, -24, BookingStatus::Completed).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/bookings/{}/", booking.id))
        .insert_header((header::AUTHORIZATION, ctx.bearer(&student).await))
        .set_json(json!({ "pickup_location": "South Hall" }))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "BOOKING_LOCKED");
    assert_eq!(body["details"]["status"], "completed");
}

#[actix_web::test]
async fn test_bookings_are_private_to_their_parties() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;
    let other = ctx.user("ben@uni.edu", UserRole::Student).await;
    let booking = ctx.booking(&student, &provider, &service, 48, BookingStatus::Pending).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/bookings/{}/", booking.id))
        .insert_header((header::AUTHORIZATION, ctx.bearer(&other).await))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/bookings/")
        .insert_header((header::AUTHORIZATION, ctx.bearer(&other).await))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 200);
    assert_eq!(body["results"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::get()
        .uri("/api/bookings/?status=pending")
        .insert_header((header::AUTHORIZATION, ctx.bearer(&provider).await))
        .to_request();
    let (_, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(body["results"][0]["id"], json!(booking.id));
}

#[actix_web::test]
async fn test_calendar_is_public_and_needs_a_range() {
    let ctx = context();
    let app = test::init_service(create_app(ctx.state.clone(), &ctx.config)).await;
    let provider = ctx.verified_provider("movers@uni.edu").await;
    let service = ctx.moving_service(&provider).await;
    let student = ctx.user("ana@uni.edu", UserRole::Student).await;
    let booking = ctx.booking(&student, &provider, &service, 48, BookingStatus::Confirmed).await;

    let req = test::TestRequest::get().uri("/api/bookings/calendar/").to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 400);
    assert!(body["details"]["fields"]["start_date"].is_array());

    let day = booking.booking_date.date_naive();
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/bookings/calendar/?start_date={}&end_date={}&service={}",
            day, day, service.id
        ))
        .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, 200);
    let days = body.as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["bookings"][0]["id"], json!(booking.id));
    assert_eq!(days[0]["bookings"][0]["student_email"], "ana@uni.edu");
}
