//! Compile-time constant assertions.
//!
//! Each assertion verifies a relationship between constants that must hold
//! for the retry loop to terminate and for records to fit the registry.

use super::api::*;
use super::coordination::*;

// ============================================================================
// Size Limits
// ============================================================================

const _: () = assert!(MAX_KEY_SIZE > 0);
const _: () = assert!(MAX_VALUE_SIZE > MAX_KEY_SIZE);
const _: () = assert!(SINGLETON_KEY_PREFIX.len() < MAX_KEY_SIZE as usize);

// ============================================================================
// Retry Budget
// ============================================================================

// Retries must be bounded
const _: () = assert!(DEFAULT_MAX_ATTEMPTS > 0);
const _: () = assert!(DEFAULT_MAX_ATTEMPTS <= MAX_ATTEMPTS_LIMIT);

// Backoff ordering
const _: () = assert!(DEFAULT_INITIAL_BACKOFF_MS > 0);
const _: () = assert!(DEFAULT_INITIAL_BACKOFF_MS <= DEFAULT_MAX_BACKOFF_MS);
const _: () = assert!(DEFAULT_MAX_BACKOFF_MS < DEFAULT_MAX_ELAPSED_MS);

// A single call must fit several times in the overall budget
const _: () = assert!(DEFAULT_ATTEMPT_TIMEOUT_MS * 2 <= DEFAULT_MAX_ELAPSED_MS);

// ============================================================================
// Liveness Probing
// ============================================================================

const _: () = assert!(DEFAULT_PROBE_ATTEMPTS > 0);
const _: () = assert!(DEFAULT_PROBE_TIMEOUT_MS <= DEFAULT_ATTEMPT_TIMEOUT_MS);
const _: () = assert!(PROBE_RETRY_DELAY_MS < DEFAULT_PROBE_TIMEOUT_MS);
