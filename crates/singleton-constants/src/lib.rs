//! Centralized constants for singleton coordination.
//!
//! Constants are fixed and immutable, enforced at compile time. Each constant
//! has explicit bounds to prevent unbounded resource allocation or retry loops.
//!
//! # Modules
//!
//! - [`api`]: Registry key and value size limits
//! - [`coordination`]: Retry budget, backoff schedule, probe timeouts, priorities
//!
//! # Usage
//!
//! ```
//! use singleton_constants::api::MAX_KEY_SIZE;
//! use singleton_constants::coordination::DEFAULT_MAX_ATTEMPTS;
//! ```

pub mod api;
mod assertions;
pub mod coordination;

/// Prelude module for commonly used constants.
pub mod prelude {
    pub use crate::api::MAX_KEY_SIZE;
    pub use crate::api::MAX_VALUE_SIZE;
    pub use crate::coordination::DEFAULT_ATTEMPT_TIMEOUT_MS;
    pub use crate::coordination::DEFAULT_INITIAL_BACKOFF_MS;
    pub use crate::coordination::DEFAULT_MAX_ATTEMPTS;
    pub use crate::coordination::DEFAULT_MAX_BACKOFF_MS;
    pub use crate::coordination::DEFAULT_MAX_ELAPSED_MS;
    pub use crate::coordination::DEFAULT_PROBE_ATTEMPTS;
    pub use crate::coordination::DEFAULT_PROBE_TIMEOUT_MS;
}

pub use api::MAX_KEY_SIZE;
pub use api::MAX_VALUE_SIZE;
pub use coordination::DEFAULT_MAX_ATTEMPTS;
pub use coordination::SINGLETON_KEY_PREFIX;
