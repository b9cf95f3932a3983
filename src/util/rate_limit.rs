//! Rate limiting for inbound peer traffic

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified messages per second
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Inbound frame limit per link. A well-behaved peer sends one Input or
/// State per tick plus the occasional Ping.
pub const INBOUND_RATE_LIMIT: u32 = 90;

/// Per-link rate limiter state
#[derive(Clone)]
pub struct LinkRateLimiter {
    inbound: Arc<Limiter>,
}

impl LinkRateLimiter {
    pub fn new() -> Self {
        Self::with_limit(INBOUND_RATE_LIMIT)
    }

    pub fn with_limit(per_second: u32) -> Self {
        Self {
            inbound: create_limiter(per_second),
        }
    }

    /// Check if an inbound frame is allowed (returns true if allowed)
    pub fn check_inbound(&self) -> bool {
        self.inbound.check().is_ok()
    }
}

impl Default for LinkRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_rejected() {
        let limiter = LinkRateLimiter::with_limit(5);
        let allowed = (0..20).filter(|_| limiter.check_inbound()).count();
        assert!(allowed >= 1);
        assert!(allowed <= 5);
    }
}
