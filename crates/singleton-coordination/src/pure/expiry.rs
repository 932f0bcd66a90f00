//! Record expiry and version succession.
//!
//! A record can carry two independent expiries:
//!
//! - `ttl_ms`, measured from creation: the worker is replaced once it is
//!   that old, alive or not.
//! - `idle_ttl_ms`, measured from the last successful lookup: the worker is
//!   replaced after going unused for that long.

use std::time::Duration;

/// Deadline for a timestamp plus an optional TTL.
///
/// `None` means the record never expires on this axis.
#[inline]
pub fn compute_expiry_deadline(start_ms: u64, ttl_ms: Option<u64>) -> Option<u64> {
    ttl_ms.map(|ttl| start_ms.saturating_add(ttl))
}

/// Check whether a record is expired at `now_ms`.
///
/// Expiry is strict: at exactly the deadline the record is still valid.
///
/// ```ignore
/// assert!(!is_record_expired(1_000, Some(500), 1_000, None, 1_500));
/// assert!(is_record_expired(1_000, Some(500), 1_000, None, 1_501));
/// ```
#[inline]
pub fn is_record_expired(
    created_at_ms: u64,
    ttl_ms: Option<u64>,
    last_accessed_ms: u64,
    idle_ttl_ms: Option<u64>,
    now_ms: u64,
) -> bool {
    let past = |deadline: Option<u64>| deadline.is_some_and(|d| now_ms > d);
    past(compute_expiry_deadline(created_at_ms, ttl_ms)) || past(compute_expiry_deadline(last_accessed_ms, idle_ttl_ms))
}

/// Version for the record that replaces `previous`.
///
/// Starts at 1 for a key with no (readable) predecessor.
#[inline]
pub fn compute_next_version(previous: Option<u64>) -> u64 {
    match previous {
        Some(version) => version.saturating_add(1),
        None => 1,
    }
}

/// Convert a duration to whole milliseconds, saturating at `u64::MAX`.
#[inline]
pub fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_no_ttl_never_expires() {
        assert!(!is_record_expired(0, None, 0, None, u64::MAX));
    }

    #[test]
    fn test_ttl_expiry_is_strict() {
        assert!(!is_record_expired(1_000, Some(500), 1_000, None, 1_500));
        assert!(is_record_expired(1_000, Some(500), 1_000, None, 1_501));
    }

    #[test]
    fn test_idle_ttl_measured_from_last_access() {
        // Created long ago, touched recently.
        assert!(!is_record_expired(0, None, 9_800, Some(500), 10_000));
        assert!(is_record_expired(0, None, 9_000, Some(500), 10_000));
    }

    #[test]
    fn test_either_expiry_triggers() {
        assert!(is_record_expired(0, Some(100), 10_000, Some(5_000), 10_001));
    }

    #[test]
    fn test_deadline_overflow_safety() {
        assert_eq!(compute_expiry_deadline(u64::MAX, Some(1)), Some(u64::MAX));
        assert!(!is_record_expired(u64::MAX, Some(1), 0, None, u64::MAX));
    }

    #[test]
    fn test_next_version() {
        assert_eq!(compute_next_version(None), 1);
        assert_eq!(compute_next_version(Some(1)), 2);
        assert_eq!(compute_next_version(Some(u64::MAX)), u64::MAX);
    }

    #[test]
    fn test_duration_to_ms() {
        assert_eq!(duration_to_ms(Duration::from_secs(3600)), 3_600_000);
        assert_eq!(duration_to_ms(Duration::MAX), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_expiry_is_monotonic_in_time(
            created in 0u64..1_000_000,
            ttl in proptest::option::of(0u64..1_000_000),
            accessed_offset in 0u64..1_000_000,
            idle in proptest::option::of(0u64..1_000_000),
            now in 0u64..4_000_000,
            later in 0u64..1_000_000,
        ) {
            let accessed = created + accessed_offset;
            if is_record_expired(created, ttl, accessed, idle, now) {
                prop_assert!(is_record_expired(created, ttl, accessed, idle, now + later));
            }
        }

        #[test]
        fn prop_next_version_strictly_increases(prev in 0u64..u64::MAX) {
            prop_assert!(compute_next_version(Some(prev)) > prev);
        }
    }
}
