//! Coordinator configuration.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use singleton_cluster_types::Priority;
use singleton_constants::api::MAX_KEY_SIZE;
use singleton_constants::coordination::DEFAULT_ATTEMPT_TIMEOUT_MS;
use singleton_constants::coordination::DEFAULT_INITIAL_BACKOFF_MS;
use singleton_constants::coordination::DEFAULT_MAX_ATTEMPTS;
use singleton_constants::coordination::DEFAULT_MAX_BACKOFF_MS;
use singleton_constants::coordination::DEFAULT_MAX_ELAPSED_MS;
use singleton_constants::coordination::DEFAULT_PROBE_ATTEMPTS;
use singleton_constants::coordination::DEFAULT_PROBE_TIMEOUT_MS;
use singleton_constants::coordination::MAX_ATTEMPTS_LIMIT;
use singleton_constants::coordination::SINGLETON_KEY_PREFIX;

use crate::error::InvalidConfigSnafu;
use crate::error::SingletonError;

/// Configuration for the singleton coordinator.
///
/// Every field has a default, so partial TOML documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingletonConfig {
    /// Maximum attempts for one `get` or `discard` sequence.
    pub max_attempts: u32,
    /// Backoff after the first transient failure, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_backoff_ms: u64,
    /// Wall-clock budget for one sequence, in milliseconds.
    pub max_elapsed_ms: u64,
    /// Timeout for each registry or scheduler call, in milliseconds.
    pub attempt_timeout_ms: u64,
    /// Timeout for one liveness probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Probes tried before a handle is reported as inconclusive.
    pub probe_attempts: u32,
    /// Priority used when a caller passes no hint.
    pub default_priority: Priority,
    /// Release the worker when its key is discarded.
    ///
    /// When false, `discard` only removes the registry binding and existing
    /// handles keep working.
    pub release_on_discard: bool,
    /// Prefix for registry keys.
    pub key_prefix: String,
}

impl Default for SingletonConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            max_elapsed_ms: DEFAULT_MAX_ELAPSED_MS,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            default_priority: Priority::default(),
            release_on_discard: true,
            key_prefix: SINGLETON_KEY_PREFIX.to_string(),
        }
    }
}

impl SingletonConfig {
    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), SingletonError> {
        let fail = |reason: String| InvalidConfigSnafu { reason }.fail();

        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return fail(format!("max_attempts must be in 1..={MAX_ATTEMPTS_LIMIT}, got {}", self.max_attempts));
        }
        if self.initial_backoff_ms == 0 {
            return fail("initial_backoff_ms must be positive".to_string());
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return fail(format!(
                "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }
        if self.max_elapsed_ms == 0 {
            return fail("max_elapsed_ms must be positive".to_string());
        }
        if self.attempt_timeout_ms == 0 || self.probe_timeout_ms == 0 {
            return fail("call timeouts must be positive".to_string());
        }
        if self.probe_attempts == 0 {
            return fail("probe_attempts must be positive".to_string());
        }
        if self.key_prefix.is_empty() {
            return fail("key_prefix must not be empty".to_string());
        }
        if self.key_prefix.len() >= MAX_KEY_SIZE as usize {
            return fail(format!("key_prefix longer than {MAX_KEY_SIZE} bytes"));
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
