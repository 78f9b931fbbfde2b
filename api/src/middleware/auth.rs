//! Bearer-token authentication for the protected CampusMove routes.
//!
//! The middleware reads the bearer token from the Authorization header,
//! resolves it to an active account through the [`AuthService`] held in the
//! application state and stores the account in the request extensions, where
//! the [`AuthContext`] extractor picks it up. Resources that mix public and
//! protected methods skip the middleware; there the extractor authenticates
//! on its own.
//!
//! [`AuthService`]: cm_core::services::AuthService

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    task::{Context, Poll},
};

use cm_core::domain::entities::user::User;
use cm_core::errors::{AuthError, DomainError};

use crate::handlers::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

/// Rejects requests without a valid access token before they reach a handler
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtAuth;

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Per-worker service built by [`JwtAuth`]
pub struct JwtAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let result = authenticate(req.headers(), req.app_data::<web::Data<AppState>>()).await;
            match result {
                Ok(context) => {
                    tracing::debug!(user_id = %context.user.id, path = %req.path(), "Request authenticated");
                    req.extensions_mut().insert(context);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                }
                Err(e) => {
                    let response = e.error_response();
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

async fn authenticate(
    headers: &HeaderMap,
    state: Option<&web::Data<AppState>>,
) -> Result<AuthContext, ApiError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::AuthenticationRequired)?;
    let state = state.ok_or_else(|| DomainError::internal("application state missing"))?;
    let user = state.auth.authenticate(&token).await?;
    Ok(AuthContext { user })
}

/// Token after `Bearer ` in the Authorization header, if any
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl FromRequest for AuthContext {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        if let Some(context) = req.extensions().get::<AuthContext>().cloned() {
            return Box::pin(ready(Ok(context)));
        }
        let headers = req.headers().clone();
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            authenticate(&headers, state.as_ref()).await.map_err(Error::from)
        })
    }
}
