//! Token endpoints under `/api/token/`

use actix_web::{web, HttpResponse};

use crate::dto::auth::{LoginRequest, MessageResponse, RefreshRequest, VerifyTokenRequest};
use crate::dto::validated;
use crate::handlers::error::ApiError;
use crate::middleware::ClientIp;
use crate::state::AppState;

/// POST /api/token/
///
/// Email and password for a token pair. Counts against the login limit.
pub async fn obtain(
    state: web::Data<AppState>,
    client: ClientIp,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let tokens = state
        .auth
        .obtain_token(&body.email, &body.password, client.as_str())
        .await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/token/refresh/
///
/// Rotates the refresh token: the old one is blacklisted and a new pair is
/// returned. Rate limited to 10 per minute per client address.
pub async fn refresh(
    state: web::Data<AppState>,
    client: ClientIp,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let tokens = state.auth.refresh(&body.refresh, client.as_str()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/token/verify/
pub async fn verify(
    state: web::Data<AppState>,
    body: web::Json<VerifyTokenRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    state.auth.verify_token(&body.token).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({})))
}

/// POST /api/token/blacklist/
pub async fn blacklist(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    state.auth.logout(&body.refresh).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Token blacklisted.")))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/token")
            .route("/", web::post().to(obtain))
            .route("/refresh/", web::post().to(refresh))
            .route("/verify/", web::post().to(verify))
            .route("/blacklist/", web::post().to(blacklist)),
    );
}
