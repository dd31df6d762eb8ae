use std::time::Duration;

use crate::configs::PlayerConfig;

/// Fixed-delay retry budget for voice reconnection.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
}

impl Backoff {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            delay,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.reconnect_attempts, config.reconnect_delay())
    }

    /// Consumes one attempt; returns the 1-based attempt number.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
