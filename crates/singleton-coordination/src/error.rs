//! Error types for singleton coordination.

use singleton_cluster_types::SchedulerError;
use singleton_kv_types::KeyValueStoreError;
use snafu::Snafu;

/// Errors surfaced by the singleton coordinator.
///
/// Transient registry and scheduler failures are absorbed by the retry loop
/// and only reach callers wrapped in [`SingletonError::RetriesExhausted`].
/// Every other variant is terminal.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SingletonError {
    /// Retry budget spent on transient failures.
    #[snafu(display("singleton '{key}' unavailable after {attempts} attempts: {reason}"))]
    RetriesExhausted {
        /// The singleton key.
        key: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last transient failure observed.
        reason: String,
    },

    /// The worker constructor failed with a non-transient error.
    #[snafu(display("constructing worker for '{key}' failed on attempt {attempt}: {source}"))]
    Construction {
        /// The singleton key.
        key: String,
        /// Attempt on which construction failed.
        attempt: u32,
        /// The scheduler's error.
        source: SchedulerError,
    },

    /// Scheduler error outside construction.
    #[snafu(display("scheduler error for '{key}': {source}"))]
    Scheduler {
        /// The singleton key.
        key: String,
        /// The underlying error.
        source: SchedulerError,
    },

    /// Registry error.
    #[snafu(display("registry error for '{key}': {source}"))]
    Registry {
        /// The singleton key.
        key: String,
        /// The underlying error.
        source: KeyValueStoreError,
    },

    /// Key rejected before any remote call.
    #[snafu(display("invalid singleton key '{key}': {reason}"))]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Coordinator configuration failed validation.
    #[snafu(display("invalid singleton configuration: {reason}"))]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// Record could not be serialized.
    #[snafu(display("serialization error for '{key}': {source}"))]
    Serialization {
        /// The singleton key.
        key: String,
        /// The underlying error.
        source: serde_json::Error,
    },
}

impl SingletonError {
    /// Whether the failure may clear on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            SingletonError::Registry { source, .. } => source.is_transient(),
            SingletonError::Scheduler { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Whether the retry budget was exhausted.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, SingletonError::RetriesExhausted { .. })
    }
}
