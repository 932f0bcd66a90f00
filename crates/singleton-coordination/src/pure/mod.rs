//! Pure decision functions for singleton coordination.
//!
//! Everything here is deterministic: no I/O, no clocks, time passed in as an
//! explicit parameter. The async shell in [`crate::coordinator`] reads the
//! registry and the clock, then asks these functions what to do.
//!
//! - [`backoff`]: exponential backoff with jitter, retry budget checks
//! - [`expiry`]: TTL and idle-TTL deadlines, version succession
//! - [`keys`]: registry key layout
//!
//! All arithmetic saturates instead of overflowing.

pub mod backoff;
pub mod expiry;
pub mod keys;

pub use backoff::BackoffResult;
pub use backoff::clamp_sleep_to_budget;
pub use backoff::compute_backoff_with_jitter;
pub use backoff::is_retry_budget_exhausted;
pub use expiry::compute_expiry_deadline;
pub use expiry::compute_next_version;
pub use expiry::duration_to_ms;
pub use expiry::is_record_expired;
pub use keys::singleton_key;
