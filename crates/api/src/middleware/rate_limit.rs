//! Per-user rate limiting for the chat SQL assistant.

use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::num::NonZeroU32;

const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(20) {
    Some(n) => n,
    None => unreachable!(),
};

/// Keyed by user id; each user gets its own bucket.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<i32>,
    clock: DefaultClock,
    per_minute: NonZeroU32,
}

impl RateLimiterState {
    /// A zero limit falls back to the default of 20 per minute.
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(DEFAULT_PER_MINUTE);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            clock: DefaultClock::default(),
            per_minute,
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute.get()
    }

    /// `Err` carries the seconds to wait, at least 1.
    pub fn check(&self, user_id: i32) -> Result<(), u64> {
        match self.limiter.check_key(&user_id) {
            Ok(()) => Ok(()),
            Err(not_until) => Err(not_until.wait_time_from(self.clock.now()).as_secs().max(1)),
        }
    }

    /// Drops buckets that have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("per_minute", &self.per_minute)
            .field("tracked_users", &self.limiter.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_uses_default() {
        assert_eq!(RateLimiterState::new(0).per_minute(), 20);
    }

    #[test]
    fn test_exhaustion_is_per_user() {
        let state = RateLimiterState::new(3);
        for _ in 0..3 {
            assert!(state.check(1).is_ok());
        }
        let retry = state.check(1).unwrap_err();
        assert!(retry >= 1);

        assert!(state.check(2).is_ok());
    }

    #[test]
    fn test_prune_keeps_state_usable() {
        let state = RateLimiterState::new(5);
        assert!(state.check(9).is_ok());
        state.prune();
        assert!(state.check(9).is_ok());
    }
}
