//! CORS middleware configuration for cross-origin requests.
//!
//! Origins come from [`CorsConfig`]: development allows any origin, other
//! environments only the origins listed in `CORS_ALLOWED_ORIGINS`.

use actix_cors::Cors;
use actix_web::http::{header, Method};

use cm_shared::config::CorsConfig;

/// Creates a CORS middleware instance for `config`
pub fn create_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::ORIGIN,
            header::HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers(vec![header::RETRY_AFTER])
        .max_age(config.max_age);

    if config.allows_any_origin() {
        tracing::info!("CORS allows any origin");
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.allowed_origins {
            tracing::info!(origin = %origin, "Adding allowed CORS origin");
            cors = cors.allowed_origin(origin);
        }
    }

    if config.allow_credentials && !config.allows_any_origin() {
        cors = cors.supports_credentials();
    }
    cors
}
