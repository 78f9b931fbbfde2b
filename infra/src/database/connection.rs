//! MySQL pool built from [`DatabaseConfig`]

use std::str::FromStr;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use tracing::{error, info};

use cm_shared::config::DatabaseConfig;

use crate::InfrastructureError;

/// Shared pool handed to every MySQL repository
#[derive(Clone)]
pub struct DatabasePool {
    pool: MySqlPool,
}

impl DatabasePool {
    /// Open the pool and, when configured, apply the embedded migrations.
    ///
    /// A malformed URL is a configuration error; an unreachable server is a
    /// database error.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        let options = MySqlConnectOptions::from_str(&config.url)
            .map_err(|e| InfrastructureError::Config(format!("invalid DATABASE_URL: {}", e)))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .max_lifetime(Duration::from_secs(config.max_lifetime))
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!(error = %e, "Could not open the MySQL pool");
                InfrastructureError::Database(e)
            })?;
        info!(
            max_connections = config.max_connections,
            open = pool.size(),
            "MySQL pool ready"
        );

        let pool = Self { pool };
        if config.run_migrations {
            pool.migrate().await?;
        }
        Ok(pool)
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Round trip a trivial query
    pub async fn ping(&self) -> Result<(), InfrastructureError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        info!(idle = self.pool.num_idle(), "Closing MySQL pool");
        self.pool.close().await;
    }

    /// Schema under `infra/migrations`
    pub async fn migrate(&self) -> Result<(), InfrastructureError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations applied");
        Ok(())
    }
}
