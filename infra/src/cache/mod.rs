//! Cache module for Redis
//!
//! Holds the Redis client used for the shared rate-limit counters.

#[cfg(feature = "redis-cache")]
pub mod redis_client;

#[cfg(all(test, feature = "redis-cache"))]
mod tests;

#[cfg(feature = "redis-cache")]
pub use redis_client::RedisClient;
