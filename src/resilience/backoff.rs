//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Calculate the delay before retry `attempt` (1-based).
///
/// The delay is `min(base_ms * 2^(attempt-1), max_ms)`, plus up to
/// `jitter_ratio` of that value as random jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter_ratio: f64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = (capped_delay as f64 * jitter_ratio) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Backoff schedule derived from the retry configuration.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_ratio: 0.0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
            jitter_ratio: config.jitter_ratio,
        }
    }

    /// Delay before retry `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_ms, self.max_ms, self.jitter_ratio)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 300, 3000, 0.0), Duration::ZERO);
        assert_eq!(calculate_backoff(1, 300, 3000, 0.0).as_millis(), 300);
        assert_eq!(calculate_backoff(2, 300, 3000, 0.0).as_millis(), 600);
        assert_eq!(calculate_backoff(3, 300, 3000, 0.0).as_millis(), 1200);
        assert_eq!(calculate_backoff(4, 300, 3000, 0.0).as_millis(), 2400);
        assert_eq!(calculate_backoff(5, 300, 3000, 0.0).as_millis(), 3000);
        assert_eq!(calculate_backoff(64, 300, 3000, 0.0).as_millis(), 3000);
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let backoff = Backoff::default();
        let mut previous = Duration::ZERO;
        for attempt in 1..=20 {
            let delay = backoff.delay(attempt);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(3000));
            previous = delay;
        }
    }

    #[test]
    fn test_jitter_stays_within_ratio() {
        for _ in 0..50 {
            let delay = calculate_backoff(2, 100, 2000, 0.1).as_millis();
            assert!((200..220).contains(&delay));
        }
    }
}
