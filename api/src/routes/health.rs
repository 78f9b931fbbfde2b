use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

/// GET /health
///
/// 200 while the storage backend answers, 503 otherwise.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    if state.repositories.health_check().await {
        HttpResponse::Ok().json(json!({ "status": "healthy", "storage": "ok" }))
    } else {
        tracing::warn!("Health check failed: storage unreachable");
        HttpResponse::ServiceUnavailable().json(json!({ "status": "unhealthy", "storage": "unreachable" }))
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
