//! Authentication service module
//!
//! This module provides the account and session flows:
//! - Registration with password policy and duplicate-email detection
//! - Email/password login and token refresh, both rate limited
//! - Logout and token verification
//! - Profile management and staff verification of providers

mod config;
mod rate_limiter;
mod service;

#[cfg(test)]
mod tests;

pub use config::AuthServiceConfig;
pub use rate_limiter::{
    rate_limit_key, seconds_until_reset, window_index, RateLimitAction, RateLimitDecision, RateLimiter,
};
pub use service::{AuthService, ProfileUpdate, Registration};
