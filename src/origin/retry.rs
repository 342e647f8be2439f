use rand::Rng;
use std::time::Duration;

use crate::config::OriginConfig;

/// Exponential backoff with randomized jitter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Spread in `[0, 1]`; 0.5 means each delay lands within ±50%
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &OriginConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            base_delay: config.retry_delay(),
            max_delay: config.max_retry_delay(),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            attempts: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay before retry number `retry` (1-based), with random jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        let unit = if self.jitter > 0.0 {
            rand::thread_rng().gen_range(-1.0..=1.0)
        } else {
            0.0
        };
        self.delay_with_unit(retry, unit)
    }

    /// Delay before retry number `retry` for a fixed jitter sample in `[-1, 1]`
    pub fn delay_with_unit(&self, retry: u32, unit: f64) -> Duration {
        let exponent = retry.saturating_sub(1).min(30);
        let backoff = self
            .base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay);

        let spread = backoff.as_secs_f64() * self.jitter * unit.clamp(-1.0, 1.0);
        let jittered = (backoff.as_secs_f64() + spread).max(0.0);

        Duration::from_secs_f64(jittered).min(self.max_delay)
    }
}
