//! src/network/rate_limit.rs
//!
//! Request throttle for the RPC transport.

use governor::{Quota, RateLimiter as GovernorRateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// A rate limiter for network requests, wrapping the `governor` crate.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<
        GovernorRateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl RateLimiter {
    /// Allows `requests_per_second` calls per second, with the same burst size.
    /// Zero is treated as one.
    pub fn per_second(requests_per_second: u32) -> Self {
        let burst = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self { limiter: Arc::new(GovernorRateLimiter::direct(Quota::per_second(burst))) }
    }

    /// Checks if a request is allowed under the current rate limit.
    pub fn allow(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_throttle() {
        let limiter = RateLimiter::per_second(2);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn test_zero_means_one() {
        let limiter = RateLimiter::per_second(0);
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }
}
