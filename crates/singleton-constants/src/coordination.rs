//! Singleton coordination constants.
//!
//! Defaults for the retry budget around transient cluster errors. All of
//! these can be overridden through `SingletonConfig`; the values here are the
//! conservative schedule used when nothing is configured.

// ============================================================================
// Registry Layout
// ============================================================================

/// Prefix under which singleton records are stored in the registry.
pub const SINGLETON_KEY_PREFIX: &str = "__singleton:";

// ============================================================================
// Retry Budget
// ============================================================================

/// Maximum attempts for a single `get` or `discard` sequence.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Hard ceiling for configured attempts.
pub const MAX_ATTEMPTS_LIMIT: u32 = 1_000;

/// Initial backoff after a transient failure (50ms).
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 50;

/// Backoff cap (2 seconds).
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;

/// Wall-clock budget for one `get` or `discard` sequence (30 seconds).
pub const DEFAULT_MAX_ELAPSED_MS: u64 = 30_000;

/// Timeout applied to each individual registry or scheduler call (5 seconds).
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Liveness Probing
// ============================================================================

/// Timeout for one liveness probe (1 second).
///
/// Probes are answered by the scheduler, so a low value is fine even on
/// slow networks.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;

/// Probes attempted before a handle is reported as inconclusive.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;

/// Delay between inconclusive probes (20ms).
pub const PROBE_RETRY_DELAY_MS: u64 = 20;

// ============================================================================
// Scheduling Priority
// ============================================================================

/// Priority passed to the scheduler when a caller gives no hint.
///
/// Singleton construction usually blocks a caller, so it is scheduled ahead
/// of background work by default.
pub const DEFAULT_CONSTRUCTION_PRIORITY: i32 = 100;
