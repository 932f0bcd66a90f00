//! Time utilities for singleton coordination.
//!
//! Registry records carry wall-clock timestamps (creation, last access) so
//! that every client in the cluster agrees on expiry. Coordinators read time
//! through the [`TimeProvider`] trait so tests can drive expiry without
//! sleeping.
//!
//! Use [`SystemTimeProvider`] in production and [`SimulatedTimeProvider`]
//! (behind the `simulation` feature) in tests.

#[cfg(feature = "simulation")]
use std::sync::Arc;
#[cfg(feature = "simulation")]
use std::sync::atomic::AtomicU64;
#[cfg(feature = "simulation")]
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Get current Unix timestamp in milliseconds.
///
/// Returns 0 if system time is before UNIX epoch instead of panicking.
#[inline]
pub fn current_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Trait for injectable time sources.
///
/// # Example
///
/// ```
/// use singleton_time::{SystemTimeProvider, TimeProvider};
///
/// fn is_before<T: TimeProvider>(time: &T, deadline_ms: u64) -> bool {
///     time.now_unix_ms() < deadline_ms
/// }
///
/// let deadline = singleton_time::current_time_ms() + 60_000;
/// assert!(is_before(&SystemTimeProvider, deadline));
/// ```
pub trait TimeProvider: Send + Sync {
    /// Get current Unix timestamp in milliseconds.
    fn now_unix_ms(&self) -> u64;
}

/// Production time provider using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> u64 {
        current_time_ms()
    }
}

/// Simulated time provider for deterministic testing.
///
/// Clones share the same underlying clock, so a test can keep one copy and
/// hand another to the coordinator.
///
/// ```ignore
/// let time = SimulatedTimeProvider::new(1_000_000);
/// time.advance_ms(500);
/// assert_eq!(time.now_unix_ms(), 1_000_500);
/// ```
#[cfg(feature = "simulation")]
#[derive(Debug, Clone)]
pub struct SimulatedTimeProvider {
    current_time_ms: Arc<AtomicU64>,
}

#[cfg(feature = "simulation")]
impl SimulatedTimeProvider {
    /// Create a new simulated clock starting at the given timestamp.
    pub fn new(initial_time_ms: u64) -> Self {
        Self {
            current_time_ms: Arc::new(AtomicU64::new(initial_time_ms)),
        }
    }

    /// Create a new simulated clock starting at the current system time.
    pub fn from_system_time() -> Self {
        Self::new(current_time_ms())
    }

    /// Advance time by the given number of milliseconds.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.current_time_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Set the current time to a specific value.
    pub fn set_ms(&self, time_ms: u64) {
        self.current_time_ms.store(time_ms, Ordering::SeqCst);
    }
}

#[cfg(feature = "simulation")]
impl Default for SimulatedTimeProvider {
    fn default() -> Self {
        Self::from_system_time()
    }
}

#[cfg(feature = "simulation")]
impl TimeProvider for SimulatedTimeProvider {
    #[inline]
    fn now_unix_ms(&self) -> u64 {
        self.current_time_ms.load(Ordering::SeqCst)
    }
}
