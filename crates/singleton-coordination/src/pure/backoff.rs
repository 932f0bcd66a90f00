//! Backoff and retry budget computations.

/// Result of backoff calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffResult {
    /// Sleep duration in milliseconds (includes jitter).
    pub sleep_ms: u64,
    /// Next backoff value (for exponential increase).
    pub next_backoff_ms: u64,
}

/// Compute exponential backoff with additive jitter.
///
/// Jitter spreads out clients that failed together so they do not hammer the
/// registry in lockstep.
///
/// # Arguments
///
/// * `current_backoff_ms` - Current backoff duration in milliseconds
/// * `max_backoff_ms` - Maximum allowed backoff in milliseconds
/// * `jitter_seed` - Random value; reduced modulo `current_backoff_ms / 2 + 1`
///
/// # Example
///
/// ```ignore
/// let result = compute_backoff_with_jitter(100, 1000, 25);
/// assert_eq!(result.sleep_ms, 125);
/// assert_eq!(result.next_backoff_ms, 200);
/// ```
#[inline]
pub fn compute_backoff_with_jitter(current_backoff_ms: u64, max_backoff_ms: u64, jitter_seed: u64) -> BackoffResult {
    let max_jitter = current_backoff_ms.saturating_div(2).saturating_add(1);
    let jitter = jitter_seed % max_jitter;

    let sleep_ms = current_backoff_ms.saturating_add(jitter).min(max_backoff_ms.max(current_backoff_ms));
    let next_backoff_ms = current_backoff_ms.saturating_mul(2).min(max_backoff_ms);

    BackoffResult {
        sleep_ms,
        next_backoff_ms,
    }
}

/// Check whether a retry loop must stop.
///
/// Exhausted once `attempts` reaches `max_attempts` or the elapsed time
/// reaches `max_elapsed_ms`, whichever comes first.
#[inline]
pub fn is_retry_budget_exhausted(attempts: u32, max_attempts: u32, elapsed_ms: u64, max_elapsed_ms: u64) -> bool {
    attempts >= max_attempts || elapsed_ms >= max_elapsed_ms
}

/// Shorten a sleep so it never runs past the elapsed-time budget.
#[inline]
pub fn clamp_sleep_to_budget(sleep_ms: u64, elapsed_ms: u64, max_elapsed_ms: u64) -> u64 {
    sleep_ms.min(max_elapsed_ms.saturating_sub(elapsed_ms))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_backoff_with_jitter() {
        let result = compute_backoff_with_jitter(100, 1000, 25);
        // jitter = 25 % (100/2 + 1) = 25
        assert_eq!(result.sleep_ms, 125);
        assert_eq!(result.next_backoff_ms, 200);
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let result = compute_backoff_with_jitter(800, 1000, 0);
        assert_eq!(result.next_backoff_ms, 1000);
    }

    #[test]
    fn test_sleep_never_exceeds_cap_by_jitter() {
        let result = compute_backoff_with_jitter(1000, 1000, 400);
        assert_eq!(result.sleep_ms, 1000);
    }

    #[test]
    fn test_backoff_overflow_safety() {
        let result = compute_backoff_with_jitter(u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(result.next_backoff_ms, u64::MAX);
        assert_eq!(result.sleep_ms, u64::MAX);
    }

    #[test]
    fn test_budget_exhausted_by_attempts() {
        assert!(!is_retry_budget_exhausted(9, 10, 0, 30_000));
        assert!(is_retry_budget_exhausted(10, 10, 0, 30_000));
    }

    #[test]
    fn test_budget_exhausted_by_time() {
        assert!(!is_retry_budget_exhausted(1, 10, 29_999, 30_000));
        assert!(is_retry_budget_exhausted(1, 10, 30_000, 30_000));
    }

    #[test]
    fn test_clamp_sleep_to_budget() {
        assert_eq!(clamp_sleep_to_budget(500, 29_800, 30_000), 200);
        assert_eq!(clamp_sleep_to_budget(500, 0, 30_000), 500);
        assert_eq!(clamp_sleep_to_budget(500, 40_000, 30_000), 0);
    }

    proptest! {
        #[test]
        fn prop_sleep_bounded(current in 1u64..10_000, max in 1u64..20_000, seed in any::<u64>()) {
            let result = compute_backoff_with_jitter(current, max, seed);
            prop_assert!(result.sleep_ms >= current.min(max.max(current)));
            prop_assert!(result.sleep_ms <= max.max(current));
            prop_assert!(result.next_backoff_ms <= max);
        }

        #[test]
        fn prop_backoff_non_decreasing_until_cap(current in 1u64..5_000, seed in any::<u64>()) {
            let max = 10_000;
            let result = compute_backoff_with_jitter(current, max, seed);
            prop_assert!(result.next_backoff_ms >= current);
        }
    }
}
