//! Retry policy for failed pipeline jobs.
//!
//! A failed attempt either puts the job back to pending with a delay
//! (exponential backoff) or, once `max_retries` attempts have failed,
//! marks it as terminally failed.

use std::time::Duration;

/// Number of failed attempts after which a job is given up.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    /// No delay at all: a retried job is eligible on the next cycle.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry_count` (1-based).
    ///
    /// The result is clamped to [`Backoff::max_delay`].
    pub fn delay_for(&self, retry_count: i32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..retry_count.max(1) {
            delay = next_delay(delay, self);
        }
        delay
    }
}

/// Calculate the next backoff delay from the current delay.
///
/// The result is clamped to [`Backoff::max_delay`].
pub fn next_delay(current: Duration, backoff: &Backoff) -> Duration {
    let next_ms = (current.as_millis() as f64 * backoff.multiplier) as u64;
    Duration::from_millis(next_ms).min(backoff.max_delay)
}

/// What to do with a job whose attempt just failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Put the job back to pending; it becomes eligible after `delay`.
    Retry { retry_count: i32, delay: Duration },
    /// Give up; the job is terminally failed.
    Exhausted { retry_count: i32 },
}

impl RetryDecision {
    pub fn retry_count(&self) -> i32 {
        match self {
            RetryDecision::Retry { retry_count, .. } | RetryDecision::Exhausted { retry_count } => {
                *retry_count
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryDecision::Exhausted { .. })
    }
}

/// Maximum attempts plus backoff shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: i32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Decide the next state for a job that failed with `retry_count`
    /// previous failures.
    ///
    /// The new count is `retry_count + 1`, never more than `max_retries`.
    pub fn on_failure(&self, retry_count: i32) -> RetryDecision {
        let max = self.max_retries.max(1);
        let next = (retry_count.max(0) + 1).min(max);

        if next >= max {
            RetryDecision::Exhausted { retry_count: next }
        } else {
            RetryDecision::Retry {
                retry_count: next,
                delay: self.backoff.delay_for(next),
            }
        }
    }
}
