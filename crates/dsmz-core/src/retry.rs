//! Bounded retry state with exponential backoff

use std::time::Duration;

/// Exponential backoff: `unit * 2^attempt` (2, 4, 8, ... units)
pub fn backoff_duration(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt))
}

/// Per-request attempt counter. Lives for one call, never persisted.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
}

impl RetryState {
    /// A zero maximum still allows a single attempt.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Claim the next attempt number (1-based), or `None` once exhausted.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.exhausted() {
            return None;
        }
        self.attempt += 1;
        Some(self.attempt)
    }

    /// True when no further attempt may be made.
    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the current attempt failed.
    pub fn backoff(&self, unit: Duration) -> Duration {
        backoff_duration(unit, self.attempt)
    }
}
