//! Application factory
//!
//! Builds the Actix-web application from shared state and configuration.
//! `main` calls it once per worker and the HTTP tests call it directly.

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App, Error, HttpResponse,
};
use tracing_actix_web::TracingLogger;

use cm_shared::config::AppConfig;
use cm_shared::{error_codes, ErrorResponse};

use crate::handlers::error::{json_error_handler, path_error_handler, query_error_handler};
use crate::middleware::{create_cors, SecurityMiddleware};
use crate::routes;
use crate::state::AppState;

/// Create and configure the application with all dependencies
pub fn create_app(
    state: web::Data<AppState>,
    config: &AppConfig,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(
            web::JsonConfig::default()
                .limit(config.server.max_payload_size)
                .error_handler(json_error_handler),
        )
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        // Registration order is inside-out: security runs innermost, the
        // request span outermost
        .wrap(SecurityMiddleware::from_config(config))
        .wrap(create_cors(&config.cors))
        .wrap(TracingLogger::default())
        .configure(routes::configure)
        .default_service(web::route().to(not_found))
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new(
        error_codes::NOT_FOUND,
        "The requested resource was not found.",
    ))
}
