//! Shared utilities and common types for the CampusMove server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types
//! - Error response structure
//! - Field validators (phone, image, email, password)
//! - Pagination

pub mod config;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, CorsConfig, DatabaseConfig, Environment, JwtConfig,
    LoggingConfig, MediaConfig, PasswordConfig, RateLimitConfig, ServerConfig,
};
pub use errors::{error_codes, ErrorResponse};
pub use types::{PaginatedResponse, Pagination};
pub use utils::{email, image, password, phone, validation};
