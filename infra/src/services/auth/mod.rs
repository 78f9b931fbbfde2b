//! Authentication-related infrastructure services

pub mod rate_limiter;


pub use rate_limiter::InMemoryRateLimiter;
#[cfg(feature = "redis-cache")]
pub use rate_limiter::RedisRateLimiter;
