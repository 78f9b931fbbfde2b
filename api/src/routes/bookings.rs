//! Bookings under `/api/bookings/`

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use cm_core::domain::value_objects::{BookingFilter, CalendarQuery};

use super::{pagination, param, QueryParams};
use crate::dto::booking::{CreateBookingRequest, StatusUpdateRequest, UpdateBookingRequest};
use crate::dto::validated;
use crate::handlers::error::ApiError;
use crate::middleware::{AuthContext, JwtAuth};
use crate::state::AppState;

/// POST /api/bookings/
///
/// Students only. The provider is taken from the service.
pub async fn create(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let booking = state.bookings.create(&auth.user, body.into()).await?;
    Ok(HttpResponse::Created().json(booking))
}

/// GET /api/bookings/
///
/// The caller's bookings as student or provider. Filters: `status`,
/// `start_date`, `end_date`, `upcoming`, `past`, `ordering`.
pub async fn list(
    state: web::Data<AppState>,
    auth: AuthContext,
    query: QueryParams,
) -> Result<HttpResponse, ApiError> {
    let filter = BookingFilter::from_query(
        param(&query, "status"),
        param(&query, "start_date"),
        param(&query, "end_date"),
        param(&query, "upcoming"),
        param(&query, "past"),
        param(&query, "ordering"),
    );
    let page = state.bookings.list_own(&auth.user, &filter, pagination(&query)).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/bookings/calendar/
///
/// Public availability view. `start_date` and `end_date` are required.
pub async fn calendar(state: web::Data<AppState>, query: QueryParams) -> Result<HttpResponse, ApiError> {
    let calendar_query = CalendarQuery::parse(
        param(&query, "start_date"),
        param(&query, "end_date"),
        param(&query, "provider"),
        param(&query, "service"),
        param(&query, "status"),
    )?;
    let days = state.bookings.calendar(&calendar_query).await?;
    Ok(HttpResponse::Ok().json(days))
}

/// GET /api/bookings/{id}/
pub async fn detail(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let booking = state.bookings.get(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(booking))
}

/// PATCH /api/bookings/{id}/status/
pub async fn update_status(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    let next = body.parse()?;
    let booking = state
        .bookings
        .update_status(&auth.user, path.into_inner(), next)
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}

/// PATCH /api/bookings/{id}/
///
/// Date and locations, while the booking is still open.
pub async fn update_details(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdateBookingRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let booking = state
        .bookings
        .update_details(&auth.user, path.into_inner(), body.into())
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/bookings")
            .route("/calendar/", web::get().to(calendar))
            .service(
                web::resource("/")
                    .wrap(JwtAuth)
                    .route(web::post().to(create))
                    .route(web::get().to(list)),
            )
            .service(
                web::resource("/{id}/")
                    .wrap(JwtAuth)
                    .route(web::get().to(detail))
                    .route(web::patch().to(update_details)),
            )
            .service(
                web::resource("/{id}/status/")
                    .wrap(JwtAuth)
                    .route(web::patch().to(update_status)),
            ),
    );
}
