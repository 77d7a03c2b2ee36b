//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Per-session limiter for fire presses
#[derive(Clone)]
pub struct PlayerRateLimiter {
    fire_limiter: Arc<Limiter>,
}

impl PlayerRateLimiter {
    pub fn new(fire_per_second: u32) -> Self {
        Self {
            fire_limiter: create_limiter(fire_per_second),
        }
    }

    /// Check if a fire press is allowed (returns true if allowed)
    pub fn check_fire(&self) -> bool {
        self.fire_limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_capped() {
        let limiter = PlayerRateLimiter::new(3);
        let allowed = (0..10).filter(|_| limiter.check_fire()).count();
        assert_eq!(allowed, 3);
    }

    #[test]
    fn test_zero_rate_still_allows_one() {
        let limiter = PlayerRateLimiter::new(0);
        assert!(limiter.check_fire());
    }
}
