//! Rate limiting utilities

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Keyed limiter, one bucket per user id
pub type UserLimiter = DefaultKeyedRateLimiter<String>;

/// Default write quota per user (reports, edits, claims, deletes)
pub const WRITE_RATE_LIMIT: u32 = 5; // Max 5 writes per second per user

/// Create a keyed rate limiter with the specified requests per second
pub fn create_user_limiter(requests_per_second: u32) -> Arc<UserLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Per-user write limiter shared across handlers
#[derive(Clone)]
pub struct WriteRateLimiter {
    limiter: Arc<UserLimiter>,
}

impl WriteRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiter: create_user_limiter(requests_per_second),
        }
    }

    /// Check if a write by this user is allowed (returns true if allowed)
    pub fn check(&self, user_id: &str) -> bool {
        self.limiter.check_key(&user_id.to_string()).is_ok()
    }

    /// Drop buckets that have fully refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

impl Default for WriteRateLimiter {
    fn default() -> Self {
        Self::new(WRITE_RATE_LIMIT)
    }
}
