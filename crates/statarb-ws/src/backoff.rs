//! Exponential backoff with a cap and jitter.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff parameters.
///
/// Delay for attempt `n` (1-based) is
/// `min(initial_delay_ms * multiplier^(n-1), max_delay_ms) + jitter`
/// with jitter drawn from `[0, jitter_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_jitter_ms() -> u64 {
    1_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl BackoffConfig {
    /// Backoff without jitter.
    pub fn fixed(initial_delay_ms: u64, multiplier: f64, max_delay_ms: u64) -> Self {
        Self {
            initial_delay_ms,
            multiplier,
            max_delay_ms,
            jitter_ms: 0,
        }
    }

    /// Capped exponential delay before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = if scaled.is_finite() {
            scaled.min(self.max_delay_ms as f64) as u64
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(capped)
    }

    /// Delay to wait before attempt `attempt` (1-based), including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + Duration::from_millis(rand_jitter(self.jitter_ms))
    }
}

/// Generate random jitter in `[0, bound)` milliseconds.
fn rand_jitter(bound: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if bound == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth_and_cap() {
        let backoff = BackoffConfig::fixed(100, 2.0, 1_000);
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_millis(1_000));
        assert_eq!(backoff.delay(500), Duration::from_millis(1_000));
    }

    #[test]
    fn test_fractional_multiplier() {
        let backoff = BackoffConfig::fixed(1_000, 1.5, 10_000);
        assert_eq!(backoff.delay(2), Duration::from_millis(1_500));
        assert_eq!(backoff.delay(3), Duration::from_millis(2_250));
    }

    #[test]
    fn test_jitter_bounded() {
        let backoff = BackoffConfig {
            initial_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 100,
            jitter_ms: 50,
        };
        for attempt in 1..20 {
            let delay = backoff.delay(attempt);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay < Duration::from_millis(150));
        }
    }

    #[test]
    fn test_attempt_zero_treated_as_first() {
        let backoff = BackoffConfig::fixed(250, 2.0, 1_000);
        assert_eq!(backoff.delay(0), Duration::from_millis(250));
    }
}
