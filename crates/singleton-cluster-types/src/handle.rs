use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Opaque reference to a remotely running stateful worker.
///
/// The scheduler owns the worker; a handle only locates it. Handles are
/// published in the registry, so they must be serializable and must not
/// carry process-local state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerHandle {
    /// Scheduler-assigned identifier, unique for the lifetime of the cluster.
    pub worker_id: String,
    /// Node hosting the worker at construction time.
    pub node_id: String,
}

impl WorkerHandle {
    pub fn new(worker_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            node_id: node_id.into(),
        }
    }
}

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.worker_id, self.node_id)
    }
}
