//! Registry record and per-call options.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use singleton_cluster_types::Priority;
use singleton_cluster_types::WorkerHandle;

use crate::pure;

/// Record published in the registry for one singleton key.
///
/// Serialized as JSON for human readability and debugging. The record only
/// references the worker; the scheduler owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SingletonRecord {
    /// Singleton key, without the registry prefix.
    pub key: String,
    /// Handle to a worker that was fully constructed before publication.
    pub handle: WorkerHandle,
    /// Generation counter, incremented by exactly one on every recreation.
    pub version: u64,
    /// When the worker was constructed (Unix timestamp milliseconds).
    pub created_at_ms: u64,
    /// Maximum age in milliseconds, regardless of liveness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
    /// Maximum time in milliseconds between successful lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_ttl_ms: Option<u64>,
    /// Last successful lookup (Unix timestamp milliseconds).
    pub last_accessed_ms: u64,
}

impl SingletonRecord {
    /// Create a record for a freshly constructed worker.
    pub fn new(key: impl Into<String>, handle: WorkerHandle, version: u64, now_ms: u64, options: &GetOptions) -> Self {
        Self {
            key: key.into(),
            handle,
            version,
            created_at_ms: now_ms,
            ttl_ms: options.ttl.map(pure::duration_to_ms),
            idle_ttl_ms: options.idle_ttl.map(pure::duration_to_ms),
            last_accessed_ms: now_ms,
        }
    }

    /// Check if this record has expired at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        pure::is_record_expired(self.created_at_ms, self.ttl_ms, self.last_accessed_ms, self.idle_ttl_ms, now_ms)
    }

    /// Earliest time at which the record expires, if it expires at all.
    pub fn expires_at_ms(&self) -> Option<u64> {
        let by_age = pure::compute_expiry_deadline(self.created_at_ms, self.ttl_ms);
        let by_idle = pure::compute_expiry_deadline(self.last_accessed_ms, self.idle_ttl_ms);
        match (by_age, by_idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Copy of this record with the access time moved forward.
    ///
    /// Never changes the version: a touch is not a recreation.
    pub fn touched(&self, now_ms: u64) -> Self {
        Self {
            last_accessed_ms: self.last_accessed_ms.max(now_ms),
            ..self.clone()
        }
    }
}

/// Options for [`SingletonCoordinator::get`](crate::SingletonCoordinator::get).
///
/// Expiry options apply to the record created by this call. A record that
/// already exists keeps the expiry it was published with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Replace the worker once it is this old.
    pub ttl: Option<Duration>,
    /// Replace the worker once it has gone this long without a lookup.
    pub idle_ttl: Option<Duration>,
    /// Scheduling hint for construction. Defaults to the configured priority.
    pub priority: Option<Priority>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = Some(idle_ttl);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}
