//! Moving-service catalogue under `/api/services/`

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use cm_core::domain::value_objects::{ServiceFilter, ServiceOrdering};

use super::{pagination, param, QueryParams};
use crate::dto::service::{with_media_urls, CreateServiceRequest, UpdateServiceRequest};
use crate::dto::validated;
use crate::handlers::error::ApiError;
use crate::middleware::{AuthContext, JwtAuth};
use crate::state::AppState;

/// GET /api/services/list/
///
/// Filters: `available`, `min_price`, `max_price`, `min_rating`,
/// `university`. Ordering: `ordering=base_price,-rating` style keys.
pub async fn list(state: web::Data<AppState>, query: QueryParams) -> Result<HttpResponse, ApiError> {
    let filter = ServiceFilter::from_query(
        param(&query, "available"),
        param(&query, "min_price"),
        param(&query, "max_price"),
        param(&query, "min_rating"),
        param(&query, "university"),
    );
    let ordering = ServiceOrdering::parse(param(&query, "ordering"));
    let page = state.catalog.list(&filter, &ordering, pagination(&query)).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/services/{id}/
pub async fn detail(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let detail = state.catalog.detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(with_media_urls(detail, &state.media)))
}

/// POST /api/services/
///
/// Verified providers only.
pub async fn create(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<CreateServiceRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let service = state.catalog.create(&auth.user, body.into()).await?;
    Ok(HttpResponse::Created().json(service))
}

/// PATCH /api/services/{id}/
///
/// The owning provider or staff.
pub async fn update(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdateServiceRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let service = state.catalog.update(&auth.user, path.into_inner(), body.into()).await?;
    Ok(HttpResponse::Ok().json(service))
}

/// GET /api/services/{id}/reviews/
pub async fn reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: QueryParams,
) -> Result<HttpResponse, ApiError> {
    let page = state
        .reviews
        .list_for_service(path.into_inner(), pagination(&query))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/services/{id}/rating-summary/
pub async fn rating_summary(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let summary = state.reviews.service_summary(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/services")
            .route("/list/", web::get().to(list))
            .service(web::resource("/").wrap(JwtAuth).route(web::post().to(create)))
            .service(
                web::resource("/{id}/")
                    .route(web::get().to(detail))
                    .route(web::patch().to(update)),
            )
            .route("/{id}/reviews/", web::get().to(reviews))
            .route("/{id}/rating-summary/", web::get().to(rating_summary)),
    );
}
