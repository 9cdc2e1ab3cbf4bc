//! Reconnect delay policies.

use std::time::Duration;
use rand::Rng;

/// How long a relay session waits before reconnecting upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay after every failure.
    Fixed(Duration),
    /// Doubling delay from `base`, capped at `max`, with up to 10% jitter.
    Exponential { base: Duration, max: Duration },
}

impl BackoffPolicy {
    /// Delay before the next attempt, given the number of consecutive failures
    /// (1 for the first failure).
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed(delay) => delay,
            BackoffPolicy::Exponential { base, max } => calculate_backoff(
                failures.max(1),
                base.as_millis() as u64,
                max.as_millis() as u64,
            ),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed(Duration::from_secs(5))
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
