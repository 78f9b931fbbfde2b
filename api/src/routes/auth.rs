//! Account endpoints under `/api/auth/`

use actix_web::{web, HttpResponse};

use crate::dto::auth::{
    AuthResponse, LoginRequest, MessageResponse, ProfileRequest, RefreshRequest, RegisterRequest,
    UserResponse, VerifyProviderRequest,
};
use crate::dto::validated;
use crate::handlers::error::ApiError;
use crate::middleware::{AuthContext, ClientIp, JwtAuth};
use crate::state::AppState;

/// POST /api/auth/register/
///
/// Creates a student or provider account and answers 201 with the account.
/// A duplicate email, mismatched passwords or a weak password are field
/// errors.
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let registration = validated(body.into_inner())?.into_registration()?;
    let user = state.auth.register(registration).await?;
    Ok(HttpResponse::Created().json(UserResponse::new(user, &state.media)))
}

/// POST /api/auth/login/
///
/// Rate limited per client address (5 per minute). Any credential problem
/// answers with the same generic 401.
pub async fn login(
    state: web::Data<AppState>,
    client: ClientIp,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    let response = state.auth.login(&body.email, &body.password, client.as_str()).await?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        user: UserResponse::new(response.user, &state.media),
        tokens: response.tokens,
    }))
}

/// POST /api/auth/logout/
///
/// Blacklists the refresh token in the body. The access token keeps working
/// until it expires.
pub async fn logout(
    state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = validated(body.into_inner())?;
    state.auth.logout(&body.refresh).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Successfully logged out.")))
}

/// GET /api/auth/profile/
pub async fn profile(state: web::Data<AppState>, auth: AuthContext) -> Result<HttpResponse, ApiError> {
    let user = state.auth.get_profile(auth.user.id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::new(user, &state.media)))
}

async fn update_profile(
    state: &AppState,
    auth: &AuthContext,
    body: ProfileRequest,
    full: bool,
) -> Result<HttpResponse, ApiError> {
    let update = validated(body)?.into_update(full)?;
    let user = state.auth.update_profile(auth.user.id, update).await?;
    Ok(HttpResponse::Ok().json(UserResponse::new(user, &state.media)))
}

/// PUT /api/auth/profile/
pub async fn replace_profile(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<ProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    update_profile(&state, &auth, body.into_inner(), true).await
}

/// PATCH /api/auth/profile/
pub async fn patch_profile(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<ProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    update_profile(&state, &auth, body.into_inner(), false).await
}

/// POST /api/auth/verify-provider/
///
/// Staff only.
pub async fn verify_provider(
    state: web::Data<AppState>,
    auth: AuthContext,
    body: web::Json<VerifyProviderRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.auth.verify_provider(&auth.user, body.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::new(user, &state.media)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/register/", web::post().to(register))
            .route("/login/", web::post().to(login))
            .route("/logout/", web::post().to(logout))
            .service(
                web::resource("/profile/")
                    .wrap(JwtAuth)
                    .route(web::get().to(profile))
                    .route(web::put().to(replace_profile))
                    .route(web::patch().to(patch_profile)),
            )
            .service(
                web::resource("/verify-provider/")
                    .wrap(JwtAuth)
                    .route(web::post().to(verify_provider)),
            ),
    );
}
