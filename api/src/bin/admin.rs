//! Maintenance commands run against the configured storage backend

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use cm_api::telemetry;
use cm_core::services::{RecalculationOptions, ReviewService, TokenService};
use cm_infra::Repositories;
use cm_shared::config::AppConfig;

#[derive(Parser)]
#[command(name = "cm-admin")]
#[command(about = "CampusMove maintenance commands")]
struct CommandLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild service and user rating aggregates from the stored reviews
    RecalculateRatings {
        /// Report the changes without writing them
        #[arg(long)]
        dry_run: bool,
        /// Only recalculate service aggregates
        #[arg(long, conflicts_with = "users_only")]
        services_only: bool,
        /// Only recalculate user aggregates
        #[arg(long)]
        users_only: bool,
        /// Rows loaded per batch
        #[arg(long, default_value_t = 100)]
        batch_size: u64,
    },
    /// Delete expired refresh tokens
    CleanupTokens,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse();
    let config = AppConfig::load().unwrap_or_else(|_| AppConfig::from_env());
    telemetry::init_tracing(&config.logging);

    let repositories = Repositories::connect(&config.database)
        .await
        .context("failed to open storage")?;

    let result = run(cli.command, &config, &repositories).await;
    repositories.close().await;
    result
}

async fn run(command: Commands, config: &AppConfig, repositories: &Repositories) -> anyhow::Result<()> {
    match command {
        Commands::RecalculateRatings {
            dry_run,
            services_only,
            users_only,
            batch_size,
        } => {
            let reviews = ReviewService::new(
                repositories.reviews.clone(),
                repositories.bookings.clone(),
                repositories.services.clone(),
                repositories.users.clone(),
            );
            let options = RecalculationOptions {
                dry_run,
                services: !users_only,
                users: !services_only,
                batch_size: batch_size.max(1),
            };
            let report = reviews
                .recalculate_ratings(options)
                .await
                .context("rating recalculation failed")?;
            info!(
                dry_run = report.dry_run,
                services_checked = report.services_checked,
                services_updated = report.services_updated,
                users_checked = report.users_checked,
                users_updated = report.users_updated,
                "Rating recalculation finished"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::CleanupTokens => {
            let tokens = TokenService::new(Arc::clone(&repositories.tokens), config.auth.jwt.clone());
            let removed = tokens.purge_expired().await.context("token cleanup failed")?;
            info!(removed, "Expired tokens removed");
            println!("Removed {} expired tokens", removed);
        }
    }
    Ok(())
}
