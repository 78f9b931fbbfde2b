use actix_web::{web, HttpServer};
use anyhow::Context;
use tracing::{info, warn};

use cm_api::{create_app, telemetry, AppState};
use cm_infra::{container, Repositories};
use cm_shared::config::AppConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config file overlay ignored: {}", e);
            AppConfig::from_env()
        }
    };
    telemetry::init_tracing(&config.logging);
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;

    info!(
        environment = ?config.environment,
        storage = ?config.database.backend,
        rate_limit = ?config.rate_limit.backend,
        "Starting CampusMove API server"
    );
    if config.auth.jwt.is_using_default_secret() {
        warn!("JWT_SECRET is not set; using the development secret");
    }

    let repositories = Repositories::connect(&config.database)
        .await
        .context("failed to open storage")?;
    let rate_limiter = container::rate_limiter(&config)
        .await
        .context("failed to open rate limit store")?;
    let media_storage = container::media_storage(&config);

    let state = web::Data::new(AppState::new(
        &config,
        repositories.clone(),
        rate_limiter,
        media_storage,
    ));

    let bind_address = config.server.bind_address();
    info!(address = %bind_address, "Server listening");

    let app_config = config.clone();
    let mut server = HttpServer::new(move || create_app(state.clone(), &app_config));
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }
    server
        .bind(&bind_address)
        .with_context(|| format!("failed to bind {}", bind_address))?
        .run()
        .await?;

    info!("Server stopped, closing storage");
    repositories.close().await;
    Ok(())
}
