//! Retry delay computation
//!
//! When a connection attempt fails or an established connection drops
//! abnormally, the manager asks the `BackoffPolicy` how long to wait before
//! the next attempt:
//!
//! ```text
//! delay = min(initial_delay * multiplier^attempt, max_delay)
//! ```
//!
//! truncated to whole milliseconds. With jitter enabled the result is then
//! scaled by a uniform random factor in `[0.5, 1.0]` so that many clients
//! dropped by the same outage do not retry in lockstep.
//!
//! The policy itself is stateless. The attempt counter lives in the
//! manager's `RetryState`, which also enforces `max_attempts`: once the
//! budget is spent the manager stops scheduling and never calls
//! `next_delay` again.
//!
//! # Examples
//!
//! ```rust
//! use roomlink_client::BackoffPolicy;
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::new(Duration::from_millis(2000), Duration::from_secs(30))
//!     .with_multiplier(1.3)
//!     .with_max_attempts(3);
//!
//! assert_eq!(policy.next_delay(0), Duration::from_millis(2000));
//! assert_eq!(policy.next_delay(1), Duration::from_millis(2600));
//! assert_eq!(policy.next_delay(2), Duration::from_millis(3380));
//! assert!(policy.is_exhausted(3));
//! ```

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with an optional jitter factor
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_attempts: u32,
    jitter: bool,
}

impl BackoffPolicy {
    /// Create a policy growing from `initial_delay` up to `max_delay`
    ///
    /// Defaults to a multiplier of 1.3, ten attempts and no jitter.
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 1.3,
            max_attempts: 10,
            jitter: false,
        }
    }

    /// Set the growth factor applied per attempt (must be greater than 1)
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the number of retries allowed before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Enable or disable the `[0.5, 1.0]` jitter factor
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Maximum number of retries
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether `attempt` retries have used up the budget
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Delay before retry number `attempt` (0-indexed)
    ///
    /// Callers check `is_exhausted` first; past the budget this still
    /// returns a capped delay rather than panicking.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64;
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let grown = base * self.multiplier.powi(exponent);
        let capped = grown.min(self.max_delay.as_millis() as f64);

        let millis = if self.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
            capped * factor
        } else {
            capped
        };

        Duration::from_millis(millis as u64)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), Duration::from_secs(30)).with_jitter(true)
    }
}
