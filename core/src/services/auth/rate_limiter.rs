//! Rate limiting seam for the authentication service
//!
//! Counters are fixed windows keyed by action, client and window index. The
//! store behind [`RateLimiter`] is injected so that every worker can share it.

use async_trait::async_trait;

use cm_shared::config::WindowLimit;

use crate::errors::DomainError;

/// Rate-limited operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    Login,
    TokenRefresh,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAction::Login => "login",
            RateLimitAction::TokenRefresh => "token_refresh",
        }
    }
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests seen in the current window, this one included
    pub count: u32,
    pub limit: u32,
    /// Seconds until the current window closes
    pub retry_after_seconds: u64,
}

impl RateLimitDecision {
    /// Decision for the `count`-th request at unix time `now`
    pub fn evaluate(count: u32, limit: WindowLimit, now: i64) -> Self {
        Self {
            allowed: count <= limit.max_requests,
            count,
            limit: limit.max_requests,
            retry_after_seconds: seconds_until_reset(limit, now),
        }
    }
}

/// Counter store for fixed-window rate limiting
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request by `client` for `action` and decide whether it may
    /// proceed. The increment must be atomic across workers.
    async fn hit(
        &self,
        action: RateLimitAction,
        client: &str,
        limit: WindowLimit,
    ) -> Result<RateLimitDecision, DomainError>;
}

/// Index of the window containing unix time `now`
pub fn window_index(limit: WindowLimit, now: i64) -> i64 {
    now.div_euclid(limit.window_seconds.max(1) as i64)
}

pub fn seconds_until_reset(limit: WindowLimit, now: i64) -> u64 {
    let window = limit.window_seconds.max(1) as i64;
    (window - now.rem_euclid(window)) as u64
}

/// Counter key: `rate_limit:{action}:{client}:{window_index}`
pub fn rate_limit_key(action: RateLimitAction, client: &str, limit: WindowLimit, now: i64) -> String {
    format!(
        "rate_limit:{}:{}:{}",
        action.as_str(),
        client,
        window_index(limit, now)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_changes_with_window() {
        let limit = WindowLimit::per_minute(5);
        let a = rate_limit_key(RateLimitAction::Login, "10.0.0.1", limit, 120);
        let b = rate_limit_key(RateLimitAction::Login, "10.0.0.1", limit, 179);
        let c = rate_limit_key(RateLimitAction::Login, "10.0.0.1", limit, 180);
        assert_eq!(a, "rate_limit:login:10.0.0.1:2");
        assert_eq!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, rate_limit_key(RateLimitAction::TokenRefresh, "10.0.0.1", limit, 120));
    }

    #[test]
    fn test_decision_allows_up_to_limit() {
        let limit = WindowLimit::per_minute(5);
        assert!(RateLimitDecision::evaluate(5, limit, 0).allowed);
        let denied = RateLimitDecision::evaluate(6, limit, 45);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, 15);
    }
}
