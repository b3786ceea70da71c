//! Rate-limit tracking and exponential backoff with jitter (spec §4.1).

use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Snapshot of the upstream's rate-limit headers.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub authenticated: bool,
}

impl RateLimitStatus {
    /// Safety margin below which the client throttles proactively rather
    /// than waiting for a 429.
    pub fn should_throttle(&self, safety_margin: u32) -> bool {
        self.remaining <= safety_margin
    }
}

/// Exponential backoff with jitter for transient upstream failures. Caps at
/// `max_retries`; each delay is `base * 2^attempt` plus up to 50% jitter.
pub struct Backoff {
    base: Duration,
    max_retries: u32,
    max_delay: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max_retries: u32, max_delay: Duration) -> Self {
        Self { base, max_retries, max_delay }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry attempt `attempt` (0-indexed). `None` once the
    /// retry budget is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let exp = self.base.as_millis().saturating_mul(1u128 << attempt.min(20));
        let capped = exp.min(self.max_delay.as_millis());
        let jitter_fraction: f64 = rand::thread_rng().gen_range(0.0..0.5);
        let jittered = capped as f64 * (1.0 + jitter_fraction);
        Some(Duration::from_millis(jittered as u64))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 5, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_within_safety_margin() {
        let status = RateLimitStatus { limit: 5000, remaining: 10, reset_at: Utc::now(), authenticated: true };
        assert!(status.should_throttle(50));
        assert!(!status.should_throttle(5));
    }

    #[test]
    fn backoff_grows_and_eventually_exhausts() {
        let backoff = Backoff::new(Duration::from_millis(100), 3, Duration::from_secs(10));
        let d0 = backoff.delay_for(0).unwrap();
        let d1 = backoff.delay_for(1).unwrap();
        assert!(d1 >= d0);
        assert!(backoff.delay_for(3).is_none());
    }

    #[test]
    fn backoff_respects_max_delay_cap() {
        let backoff = Backoff::new(Duration::from_millis(100), 20, Duration::from_millis(500));
        let delay = backoff.delay_for(15).unwrap();
        assert!(delay <= Duration::from_millis(750));
    }
}
