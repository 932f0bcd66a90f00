//! Liveness probing of published worker handles.

use std::sync::Arc;
use std::time::Duration;

use singleton_cluster_types::SchedulerError;
use singleton_cluster_types::WorkerHandle;
use singleton_constants::coordination::PROBE_RETRY_DELAY_MS;
use singleton_traits::WorkerScheduler;
use tracing::debug;

use crate::pure::duration_to_ms;

/// What a probe says about a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The worker answered.
    Alive,
    /// The scheduler reports the worker destroyed or unknown.
    Dead,
    /// No answer either way: timeout or a transient scheduler failure.
    Inconclusive,
}

/// Probes handles through the scheduler with a bounded timeout.
pub struct LivenessChecker<W: WorkerScheduler + ?Sized> {
    scheduler: Arc<W>,
    probe_timeout: Duration,
    probe_attempts: u32,
}

impl<W: WorkerScheduler + ?Sized> LivenessChecker<W> {
    pub fn new(scheduler: Arc<W>, probe_timeout: Duration, probe_attempts: u32) -> Self {
        Self {
            scheduler,
            probe_timeout,
            probe_attempts: probe_attempts.max(1),
        }
    }

    /// Probe once.
    ///
    /// Only errors that are neither transient nor "worker gone" are returned
    /// as `Err`.
    pub async fn check(&self, handle: &WorkerHandle) -> Result<Liveness, SchedulerError> {
        match tokio::time::timeout(self.probe_timeout, self.scheduler.probe(handle)).await {
            Ok(Ok(())) => Ok(Liveness::Alive),
            Ok(Err(e)) if e.is_worker_gone() => Ok(Liveness::Dead),
            Ok(Err(e)) if e.is_transient() => {
                debug!(%handle, error = %e, "probe failed transiently");
                Ok(Liveness::Inconclusive)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!(%handle, timeout_ms = duration_to_ms(self.probe_timeout), "probe timed out");
                Ok(Liveness::Inconclusive)
            }
        }
    }

    /// Probe until the answer is conclusive or the probe attempts run out.
    ///
    /// A slow worker is never declared dead: exhausting the attempts yields
    /// `Inconclusive`.
    pub async fn confirm(&self, handle: &WorkerHandle) -> Result<Liveness, SchedulerError> {
        for attempt in 1..=self.probe_attempts {
            match self.check(handle).await? {
                Liveness::Inconclusive if attempt < self.probe_attempts => {
                    tokio::time::sleep(Duration::from_millis(PROBE_RETRY_DELAY_MS)).await;
                }
                verdict => return Ok(verdict),
            }
        }
        Ok(Liveness::Inconclusive)
    }
}
