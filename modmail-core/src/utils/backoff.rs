use std::time::Duration;

use crate::config::BackoffConfig;

/// Exponential reconnect delay: `initial * 2^attempt`, capped at `max`.
///
/// Retries are unlimited; [`Backoff::reset`] after a successful connect.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            initial: config.initial,
            max: config.max.max(config.initial),
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt. Advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
