use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use async_trait::async_trait;
use singleton_cluster_types::Priority;
use singleton_cluster_types::SchedulerError;
use singleton_cluster_types::WorkerHandle;
use singleton_traits::WorkerScheduler;
use tracing::debug;

/// Number of simulated nodes workers are spread across.
const SIMULATED_NODES: u64 = 3;

/// Construction request understood by [`DeterministicScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub name: String,
    /// When set, construction fails terminally with this message.
    pub fail_with: Option<String>,
}

impl WorkerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_with: None,
        }
    }

    /// A spec whose constructor raises `reason`.
    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_with: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
enum ProbeBehavior {
    Answer,
    Hang,
    Fail(SchedulerError),
}

#[derive(Debug)]
struct Worker {
    name: String,
    alive: bool,
    probe: ProbeBehavior,
}

#[derive(Debug, Default)]
struct State {
    workers: HashMap<String, Worker>,
    next_id: u64,
    construction_attempts: u64,
    constructions: u64,
    releases: u64,
    probes: u64,
    priorities: Vec<Priority>,
    failing_constructions: u32,
    failing_probes: u32,
    fail_releases: bool,
    construction_delay: Duration,
}

/// In-memory scheduler with controllable worker failures.
///
/// Workers are plain table entries. Killing one makes later probes report
/// [`SchedulerError::WorkerLost`]; a handle the scheduler never issued
/// reports [`SchedulerError::UnknownWorker`].
#[derive(Debug, Default)]
pub struct DeterministicScheduler {
    state: Mutex<State>,
}

impl DeterministicScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate the worker's node dying.
    pub fn kill(&self, handle: &WorkerHandle) {
        if let Some(worker) = self.state().workers.get_mut(&handle.worker_id) {
            worker.alive = false;
        }
    }

    pub fn is_alive(&self, handle: &WorkerHandle) -> bool {
        self.state().workers.get(&handle.worker_id).is_some_and(|w| w.alive)
    }

    /// Make probes of `handle` never return.
    pub fn hang_probes(&self, handle: &WorkerHandle) {
        self.set_probe_behavior(handle, ProbeBehavior::Hang);
    }

    /// Make probes of `handle` fail with `error`.
    pub fn set_probe_error(&self, handle: &WorkerHandle, error: SchedulerError) {
        self.set_probe_behavior(handle, ProbeBehavior::Fail(error));
    }

    /// Restore normal probe answers for `handle`.
    pub fn heal_probes(&self, handle: &WorkerHandle) {
        self.set_probe_behavior(handle, ProbeBehavior::Answer);
    }

    fn set_probe_behavior(&self, handle: &WorkerHandle, probe: ProbeBehavior) {
        if let Some(worker) = self.state().workers.get_mut(&handle.worker_id) {
            worker.probe = probe;
        }
    }

    /// Fail the next `count` probes of any worker with a transient error.
    pub fn fail_next_probes(&self, count: u32) {
        self.state().failing_probes = count;
    }

    /// Fail the next `count` constructions with a transient error.
    pub fn fail_next_constructions(&self, count: u32) {
        self.state().failing_constructions = count;
    }

    /// Make every release call fail.
    pub fn fail_releases(&self, fail: bool) {
        self.state().fail_releases = fail;
    }

    /// Delay each construction by `delay`.
    pub fn set_construction_delay(&self, delay: Duration) {
        self.state().construction_delay = delay;
    }

    /// Successful constructions.
    pub fn construction_count(&self) -> u64 {
        self.state().constructions
    }

    /// Every call to `submit_construction`, successful or not.
    pub fn construction_attempts(&self) -> u64 {
        self.state().construction_attempts
    }

    pub fn release_count(&self) -> u64 {
        self.state().releases
    }

    pub fn probe_count(&self) -> u64 {
        self.state().probes
    }

    /// Priorities of successful constructions, in order.
    pub fn priorities(&self) -> Vec<Priority> {
        self.state().priorities.clone()
    }

    pub fn live_workers(&self) -> usize {
        self.state().workers.values().filter(|w| w.alive).count()
    }

    /// Names of the specs behind the live workers.
    pub fn live_worker_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.state().workers.values().filter(|w| w.alive).map(|w| w.name.clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl WorkerScheduler for DeterministicScheduler {
    type Spec = WorkerSpec;

    async fn submit_construction(&self, spec: WorkerSpec, priority: Priority) -> Result<WorkerHandle, SchedulerError> {
        let delay = {
            let mut state = self.state();
            state.construction_attempts += 1;
            if state.failing_constructions > 0 {
                state.failing_constructions -= 1;
                return Err(SchedulerError::Unavailable {
                    reason: "injected construction fault".to_string(),
                });
            }
            state.construction_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = spec.fail_with {
            return Err(SchedulerError::ConstructionFailed { reason });
        }

        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let handle = WorkerHandle::new(format!("worker-{id}"), format!("node-{}", id % SIMULATED_NODES + 1));
        state.workers.insert(handle.worker_id.clone(), Worker {
            name: spec.name,
            alive: true,
            probe: ProbeBehavior::Answer,
        });
        state.constructions += 1;
        state.priorities.push(priority);
        debug!(%handle, priority = priority.value(), "constructed worker");
        Ok(handle)
    }

    async fn probe(&self, handle: &WorkerHandle) -> Result<(), SchedulerError> {
        let behavior = {
            let mut state = self.state();
            state.probes += 1;
            if state.failing_probes > 0 {
                state.failing_probes -= 1;
                return Err(SchedulerError::Overloaded {
                    reason: "injected probe fault".to_string(),
                });
            }
            match state.workers.get(&handle.worker_id) {
                None => {
                    return Err(SchedulerError::UnknownWorker {
                        worker_id: handle.worker_id.clone(),
                    });
                }
                Some(worker) if !worker.alive => {
                    return Err(SchedulerError::WorkerLost {
                        worker_id: handle.worker_id.clone(),
                    });
                }
                Some(worker) => worker.probe.clone(),
            }
        };

        match behavior {
            ProbeBehavior::Answer => Ok(()),
            ProbeBehavior::Fail(error) => Err(error),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }

    async fn release(&self, handle: &WorkerHandle) -> Result<(), SchedulerError> {
        let mut state = self.state();
        state.releases += 1;
        if state.fail_releases {
            return Err(SchedulerError::Unavailable {
                reason: "injected release fault".to_string(),
            });
        }
        match state.workers.get_mut(&handle.worker_id) {
            Some(worker) => {
                worker.alive = false;
                Ok(())
            }
            None => Err(SchedulerError::UnknownWorker {
                worker_id: handle.worker_id.clone(),
            }),
        }
    }
}
