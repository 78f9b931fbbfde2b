//! Mock implementations for testing authentication service

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use cm_shared::config::WindowLimit;

use crate::errors::DomainError;
use crate::services::auth::{rate_limit_key, RateLimitAction, RateLimitDecision, RateLimiter};

/// Counts hits per key; can be switched into a failing state
#[derive(Default)]
pub struct MockRateLimiter {
    pub counts: Mutex<HashMap<String, u32>>,
    pub unavailable: AtomicBool,
}

impl MockRateLimiter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn total_hits(&self) -> u32 {
        self.counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl RateLimiter for MockRateLimiter {
    async fn hit(
        &self,
        action: RateLimitAction,
        client: &str,
        limit: WindowLimit,
    ) -> Result<RateLimitDecision, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::internal("counter store down"));
        }
        // One fixed window for the whole test
        let key = rate_limit_key(action, client, limit, 0);
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key).or_insert(0);
        *count += 1;
        Ok(RateLimitDecision::evaluate(*count, limit, Utc::now().timestamp()))
    }
}
