//! Public per-user review views under `/api/users/`

use actix_web::{web, HttpResponse};
use uuid::Uuid;

use cm_core::repositories::ReviewDirection;

use super::{pagination, param, QueryParams};
use crate::handlers::error::ApiError;
use crate::state::AppState;

/// GET /api/users/{id}/reviews/
///
/// `direction=given` lists reviews the user wrote; anything else the ones
/// they received.
pub async fn reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: QueryParams,
) -> Result<HttpResponse, ApiError> {
    let direction = ReviewDirection::parse(param(&query, "direction"));
    let page = state
        .reviews
        .list_for_user(path.into_inner(), direction, pagination(&query))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/users/{id}/rating-summary/
pub async fn rating_summary(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let summary = state.reviews.user_summary(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users")
            .route("/{id}/reviews/", web::get().to(reviews))
            .route("/{id}/rating-summary/", web::get().to(rating_summary)),
    );
}
