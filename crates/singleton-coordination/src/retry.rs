//! Retry budget shared by the `get` and `discard` loops.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::config::SingletonConfig;
use crate::pure::clamp_sleep_to_budget;
use crate::pure::compute_backoff_with_jitter;
use crate::pure::is_retry_budget_exhausted;

/// Outcome of one attempt inside a retry loop.
#[derive(Debug)]
pub(crate) enum Attempt<T> {
    /// The attempt produced a final value.
    Ready(T),
    /// The attempt hit a recoverable condition.
    ///
    /// `backoff` is false for lost races, which retry immediately since the
    /// winner's record is already visible.
    Retry { reason: String, backoff: bool },
}

impl<T> Attempt<T> {
    pub(crate) fn backoff(reason: impl Into<String>) -> Self {
        Attempt::Retry {
            reason: reason.into(),
            backoff: true,
        }
    }

    pub(crate) fn immediate(reason: impl Into<String>) -> Self {
        Attempt::Retry {
            reason: reason.into(),
            backoff: false,
        }
    }
}

/// Attempt counter, elapsed-time budget and exponential backoff state.
#[derive(Debug)]
pub struct RetryBudget {
    started: Instant,
    attempts: u32,
    backoff_ms: u64,
    max_attempts: u32,
    max_backoff_ms: u64,
    max_elapsed_ms: u64,
}

impl RetryBudget {
    pub fn new(config: &SingletonConfig) -> Self {
        Self {
            started: Instant::now(),
            attempts: 0,
            backoff_ms: config.initial_backoff_ms,
            max_attempts: config.max_attempts,
            max_backoff_ms: config.max_backoff_ms,
            max_elapsed_ms: config.max_elapsed_ms,
        }
    }

    /// Record the start of an attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether another attempt may start.
    pub fn has_remaining(&self) -> bool {
        !is_retry_budget_exhausted(self.attempts, self.max_attempts, self.elapsed_ms(), self.max_elapsed_ms)
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    ///
    /// Advances the exponential backoff. The delay never runs past the
    /// elapsed-time budget.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.has_remaining() {
            return None;
        }
        let seed = rand::rng().random_range(0..=self.backoff_ms);
        let backoff = compute_backoff_with_jitter(self.backoff_ms, self.max_backoff_ms, seed);
        self.backoff_ms = backoff.next_backoff_ms;

        let sleep_ms = clamp_sleep_to_budget(backoff.sleep_ms, self.elapsed_ms(), self.max_elapsed_ms);
        Some(Duration::from_millis(sleep_ms))
    }
}
