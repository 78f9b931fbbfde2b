use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::dto::review::{CreateReviewRequest, UpdateReviewRequest};
use crate::dto::validated;
use crate::handlers::error::ApiError;
use crate::middleware::{AuthContext, JwtAuth};
use crate::state::AppState;

/// POST /api/reviews/
///
/// One review per completed booking, written by either party about the
/// other.
pub async fn create(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let review = state
        .reviews
        .create(&auth.user, body.booking_id, body.stars(), &body.comment)
        .await?;
    Ok(HttpResponse::Created().json(review))
}

/// PATCH /api/reviews/{id}/
///
/// The reviewer only; rating and comment are the editable fields.
pub async fn update(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdateReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let review = state.reviews.update(&auth.user, path.into_inner(), body.into()).await?;
    Ok(HttpResponse::Ok().json(review))
}

/// DELETE /api/reviews/{id}/
pub async fn delete(
    state: web::Data<AppState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.reviews.delete(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/reviews")
            .wrap(JwtAuth)
            .route("/", web::post().to(create))
            .service(
                web::resource("/{id}/")
                    .route(web::patch().to(update))
                    .route(web::delete().to(delete)),
            ),
    );
}
