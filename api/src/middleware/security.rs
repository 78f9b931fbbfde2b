//! HTTPS enforcement and security response headers.
//!
//! In production plain-HTTP requests are refused unless a trusted proxy
//! reports `X-Forwarded-Proto: https`, and every response carries the usual
//! hardening headers. Other environments pass requests through untouched.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderName, HeaderValue},
    Error, ResponseError,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    task::{Context, Poll},
};

use cm_core::errors::DomainError;
use cm_shared::config::AppConfig;

use crate::handlers::error::ApiError;

/// Security middleware factory
#[derive(Debug, Clone)]
pub struct SecurityMiddleware {
    enforce_https: bool,
    add_security_headers: bool,
    trusted_proxies: Rc<[String]>,
}

impl SecurityMiddleware {
    /// Production settings turn both checks on
    pub fn from_config(config: &AppConfig) -> Self {
        let production = config.environment.is_production();
        tracing::info!(
            enforce_https = production,
            trusted_proxies = ?config.server.trusted_proxies,
            "Security middleware configured"
        );
        Self {
            enforce_https: production,
            add_security_headers: production,
            trusted_proxies: config.server.trusted_proxies.clone().into(),
        }
    }

    /// Headers only, no HTTPS check
    pub fn headers_only() -> Self {
        Self {
            enforce_https: false,
            add_security_headers: true,
            trusted_proxies: Rc::from(Vec::new()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityMiddlewareService {
            service: Rc::new(service),
            settings: self.clone(),
        }))
    }
}

pub struct SecurityMiddlewareService<S> {
    service: Rc<S>,
    settings: SecurityMiddleware,
}

impl<S, B> Service<ServiceRequest> for SecurityMiddlewareService<S>
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
        let settings = self.settings.clone();

        Box::pin(async move {
            if settings.enforce_https && !is_secure_request(&req, &settings.trusted_proxies) {
                tracing::warn!(method = %req.method(), path = %req.path(), "Insecure request blocked");
                let response = ApiError::from(DomainError::permission_denied("HTTPS required")).error_response();
                let mut response = req.into_response(response).map_into_right_body();
                add_security_response_headers(&mut response);
                return Ok(response);
            }

            let mut response = service.call(req).await?.map_into_left_body();
            if settings.add_security_headers {
                add_security_response_headers(&mut response);
            }
            Ok(response)
        })
    }
}

fn is_secure_request(req: &ServiceRequest, trusted_proxies: &[String]) -> bool {
    // connection_info() trusts forwarding headers from anyone
    if req.app_config().secure() {
        return true;
    }

    let peer = req.peer_addr().map(|addr| addr.ip().to_string());
    let from_trusted_proxy = peer
        .as_deref()
        .map(|ip| trusted_proxies.iter().any(|proxy| proxy == ip))
        .unwrap_or(false);

    from_trusted_proxy
        && req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|value| value.to_str().ok())
            .map(|proto| proto.eq_ignore_ascii_case("https"))
            .unwrap_or(false)
}

fn add_security_response_headers<B>(response: &mut ServiceResponse<B>) {
    const HEADERS: [(&str, &str); 7] = [
        ("strict-transport-security", "max-age=31536000; includeSubDomains"),
        ("x-content-type-options", "nosniff"),
        ("x-frame-options", "DENY"),
        ("x-xss-protection", "1; mode=block"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("content-security-policy", "default-src 'none'; frame-ancestors 'none';"),
        (
            "permissions-policy",
            "accelerometer=(), camera=(), geolocation=(), gyroscope=(), microphone=(), payment=(), usb=()",
        ),
    ];

    let headers = response.headers_mut();
    for (name, value) in HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    // JSON API responses are never cached by intermediaries
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
}
