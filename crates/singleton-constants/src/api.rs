//! Registry API bounds.
//!
//! Applied to every write before it reaches the registry.

/// Maximum size of a single registry key in bytes (1 KB).
///
/// Includes the singleton key prefix.
pub const MAX_KEY_SIZE: u32 = 1024;

/// Maximum size of a single registry value in bytes (64 KB).
///
/// A singleton record is a small JSON document; anything near this limit
/// indicates a malformed handle.
pub const MAX_VALUE_SIZE: u32 = 64 * 1024;
