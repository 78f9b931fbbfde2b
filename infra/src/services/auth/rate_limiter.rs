//! Fixed-window rate limiter stores
//!
//! [`RedisRateLimiter`] shares counters between every worker and process
//! pointed at the same Redis. [`InMemoryRateLimiter`] keeps them in this
//! process only and suits single-instance deployments and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use cm_core::services::auth::{rate_limit_key, window_index};
use cm_core::services::{RateLimitAction, RateLimitDecision, RateLimiter};
use cm_core::DomainError;
use cm_shared::config::WindowLimit;

#[cfg(feature = "redis-cache")]
pub use self::redis_backed::RedisRateLimiter;

#[cfg(feature = "redis-cache")]
mod redis_backed {
    use std::sync::Arc;

    use super::*;
    use crate::cache::redis_client::RedisClient;

    /// Counters shared through Redis
    pub struct RedisRateLimiter {
        redis: Arc<RedisClient>,
    }

    impl RedisRateLimiter {
        pub fn new(redis: Arc<RedisClient>) -> Self {
            Self { redis }
        }
    }

    #[async_trait]
    impl RateLimiter for RedisRateLimiter {
        async fn hit(
            &self,
            action: RateLimitAction,
            client: &str,
            limit: WindowLimit,
        ) -> Result<RateLimitDecision, DomainError> {
            let now = Utc::now().timestamp();
            let key = rate_limit_key(action, client, limit, now);
            let count = self
                .redis
                .incr_with_expiry(&key, limit.window_seconds)
                .await?;

            let count = u32::try_from(count).unwrap_or(u32::MAX);
            Ok(RateLimitDecision::evaluate(count, limit, now))
        }
    }
}

/// Process-local counters
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    /// Counter key to (window index, hits)
    counters: Mutex<HashMap<String, (i64, u32)>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a hit at unix time `now`
    pub fn hit_at(&self, action: RateLimitAction, client: &str, limit: WindowLimit, now: i64) -> RateLimitDecision {
        let key = rate_limit_key(action, client, limit, now);
        let window = window_index(limit, now);

        let mut counters = self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Drop counters of windows that have closed
        counters.retain(|_, (w, _)| *w >= window - 1);

        let entry = counters.entry(key).or_insert((window, 0));
        entry.1 = entry.1.saturating_add(1);
        RateLimitDecision::evaluate(entry.1, limit, now)
    }

    /// Number of live counters
    pub fn len(&self) -> usize {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn hit(
        &self,
        action: RateLimitAction,
        client: &str,
        limit: WindowLimit,
    ) -> Result<RateLimitDecision, DomainError> {
        Ok(self.hit_at(action, client, limit, Utc::now().timestamp()))
    }
}
