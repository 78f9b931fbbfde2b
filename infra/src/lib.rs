//! # Infrastructure Layer
//!
//! Concrete implementations of the seams `cm_core` defines, following Clean
//! Architecture principles.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL repositories using SQLx, with row locks around
//!   every read-modify-write
//! - **Cache**: Redis client for shared counters
//! - **Services**: the fixed-window rate limiter stores
//! - **Storage**: media files on the local filesystem
//! - **Container**: wiring of the configured backends into trait objects
//!
//! ## Features
//!
//! - `mysql`: Enable MySQL database support (default)
//! - `redis-cache`: Enable Redis rate limiting (default)

// Re-export core types for convenience
pub use cm_core::errors::*;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Cache module - Redis client and rate-limit counters
pub mod cache;

/// Rate limiter stores
pub mod services;

/// Storage module - uploaded media on disk
pub mod storage;

/// Repository and service wiring
pub mod container;

pub use container::Repositories;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[cfg(feature = "mysql")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure at startup
    #[cfg(feature = "mysql")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Redis cache error
    #[cfg(feature = "redis-cache")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(error: InfrastructureError) -> Self {
        DomainError::internal(error)
    }
}
