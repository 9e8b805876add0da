//! Adaptive poll interval
//!
//! Healthy feeds poll at the base interval. A run of failures at or past the
//! error threshold doubles the interval up to the ceiling; isolated failures
//! tighten it by half a second down to the floor.

use rand::Rng;
use std::time::Duration;

/// Step applied on failures below the error threshold
const TIGHTEN_STEP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct PollBackoff {
    base: Duration,
    min: Duration,
    max: Duration,
    error_threshold: u32,
    consecutive_errors: u32,
    current: Duration,
}

impl PollBackoff {
    pub fn new(base: Duration, min: Duration, max: Duration, error_threshold: u32) -> Self {
        Self {
            base,
            min,
            max,
            error_threshold,
            consecutive_errors: 0,
            current: base,
        }
    }

    /// Current sleep interval
    pub fn interval(&self) -> Duration {
        self.current
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn on_success(&mut self) -> Duration {
        self.consecutive_errors = 0;
        self.current = self.base;
        self.current
    }

    pub fn on_failure(&mut self) -> Duration {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.current = if self.consecutive_errors >= self.error_threshold {
            (self.current * 2).min(self.max)
        } else {
            self.current.saturating_sub(TIGHTEN_STEP).max(self.min)
        };
        self.current
    }

    /// Current interval plus uniform jitter in `0..=jitter`
    pub fn jittered<R: Rng>(&self, jitter: Duration, rng: &mut R) -> Duration {
        let jitter_ms = jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.current;
        }
        self.current + Duration::from_millis(rng.random_range(0..=jitter_ms))
    }
}
