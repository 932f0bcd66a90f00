use thiserror::Error;

/// Errors reported by the cluster scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The node hosting the worker died or the worker was evicted.
    #[error("worker '{worker_id}' was lost")]
    WorkerLost { worker_id: String },
    /// The scheduler has no record of the worker.
    #[error("unknown worker '{worker_id}'")]
    UnknownWorker { worker_id: String },
    /// The worker's constructor raised an error.
    #[error("worker construction failed: {reason}")]
    ConstructionFailed { reason: String },
    /// The scheduler refused the request and will keep refusing it.
    #[error("request rejected: {reason}")]
    Rejected { reason: String },
    #[error("scheduler unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("scheduler overloaded: {reason}")]
    Overloaded { reason: String },
    #[error("scheduler call timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl SchedulerError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SchedulerError::Unavailable { .. } | SchedulerError::Overloaded { .. } | SchedulerError::Timeout { .. }
        )
    }

    /// Whether the error proves the referenced worker no longer exists.
    pub fn is_worker_gone(&self) -> bool {
        matches!(self, SchedulerError::WorkerLost { .. } | SchedulerError::UnknownWorker { .. })
    }
}
