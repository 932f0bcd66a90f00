//! Registry error type.

use thiserror::Error;

/// Errors returned by a registry (`KeyValueStore`) implementation.
///
/// Variants are split into transient failures, which are expected to clear
/// on retry, and terminal failures. See [`KeyValueStoreError::is_transient`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyValueStoreError {
    #[error("key '{key}' not found")]
    NotFound { key: String },
    #[error("key must not be empty")]
    EmptyKey,
    #[error("key size {size} exceeds maximum of {max} bytes")]
    KeyTooLarge { size: u32, max: u32 },
    #[error("value size {size} exceeds maximum of {max} bytes")]
    ValueTooLarge { size: u32, max: u32 },
    #[error("compare-and-swap failed for key '{key}': expected {expected:?}, found {actual:?}")]
    CompareAndSwapFailed {
        key: String,
        expected: Option<String>,
        actual: Option<String>,
    },
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    #[error("not leader; current leader: {leader:?}; {reason}")]
    NotLeader { leader: Option<u64>, reason: String },
    #[error("registry unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("operation failed: {reason}")]
    Failed { reason: String },
}

impl KeyValueStoreError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Timeouts, leader changes and temporary unreachability are transient.
    /// Validation errors and `Failed` are terminal. CAS failures are neither:
    /// callers handle them as conflicts.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            KeyValueStoreError::Timeout { .. }
                | KeyValueStoreError::NotLeader { .. }
                | KeyValueStoreError::Unavailable { .. }
        )
    }
}
