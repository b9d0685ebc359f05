use crate::error::AppError;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Budget of one limited action
#[derive(Debug, Clone, Copy)]
pub struct Limit {
    pub capacity: u32,
    /// Tokens regained per second
    pub refill_rate: f64,
}

impl Limit {
    pub const LOGIN: Limit = Limit {
        capacity: 5,
        refill_rate: 0.1,
    };
    pub const PURCHASE: Limit = Limit {
        capacity: 20,
        refill_rate: 5.0,
    };
}

#[derive(Clone)]
struct Bucket {
    capacity: u32,
    tokens: f64,
    refill_rate: f64,
    last_update: Instant,
}

impl Bucket {
    fn new(limit: Limit) -> Self {
        Self {
            capacity: limit.capacity,
            tokens: limit.capacity as f64,
            refill_rate: limit.refill_rate,
            last_update: Instant::now(),
        }
    }

    fn allow_request(&mut self, tokens: u32) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = f64::min(
            self.capacity as f64,
            self.tokens + elapsed * self.refill_rate,
        );
        self.last_update = now;

        if self.tokens >= tokens as f64 {
            self.tokens -= tokens as f64;
            true
        } else {
            false
        }
    }

    /// Untouched since `older_than` and refilled to capacity by `now`.
    /// Dropping such a bucket loses no state.
    fn is_idle(&self, now: Instant, older_than: Duration) -> bool {
        let idle = now.saturating_duration_since(self.last_update);
        let refilled = self.tokens + idle.as_secs_f64() * self.refill_rate;
        idle >= older_than && refilled >= self.capacity as f64
    }
}

/// Token buckets keyed by `"<subject>:<action>"`
#[derive(Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, subject: &str, action: &str, limit: Limit) -> Result<(), AppError> {
        let key = format!("{}:{}", subject, action);
        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(limit));

        if bucket.allow_request(1) {
            Ok(())
        } else {
            tracing::warn!(subject, action, "rate limit hit");
            Err(AppError::RateLimitExceeded(format!(
                "too many {} attempts, slow down",
                action
            )))
        }
    }

    /// Drop buckets that are full and have been idle for `older_than`;
    /// returns how many were dropped.
    pub fn purge_idle(&self, older_than: Duration) -> usize {
        self.purge_idle_at(Instant::now(), older_than)
    }

    fn purge_idle_at(&self, now: Instant, older_than: Duration) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_idle(now, older_than));
        before.saturating_sub(self.buckets.len())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.buckets.len()
    }
}
