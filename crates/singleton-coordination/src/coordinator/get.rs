//! Get-or-create.

use singleton_cluster_types::WorkerHandle;
use singleton_traits::KeyValueStore;
use singleton_traits::WorkerScheduler;
use snafu::ResultExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SingletonCoordinator;
use crate::error::ConstructionSnafu;
use crate::error::RetriesExhaustedSnafu;
use crate::error::SchedulerSnafu;
use crate::error::SingletonError;
use crate::liveness::Liveness;
use crate::pure::compute_next_version;
use crate::pure::duration_to_ms;
use crate::registry::RecordSnapshot;
use crate::registry::RegistryRead;
use crate::registry::WriteOutcome;
use crate::retry::Attempt;
use crate::retry::RetryBudget;
use crate::types::GetOptions;
use crate::types::SingletonRecord;

/// What the current record is being replaced from.
#[derive(Debug, Default)]
struct Predecessor {
    /// Raw value to compare against; `None` when the key is absent.
    raw: Option<String>,
    version: Option<u64>,
    handle: Option<WorkerHandle>,
}

impl From<RecordSnapshot> for Predecessor {
    fn from(snapshot: RecordSnapshot) -> Self {
        Self {
            raw: Some(snapshot.raw),
            version: Some(snapshot.record.version),
            handle: Some(snapshot.record.handle),
        }
    }
}

impl<K: KeyValueStore + ?Sized, W: WorkerScheduler + ?Sized> SingletonCoordinator<K, W> {
    /// Return the live worker registered under `key`, creating it if needed.
    ///
    /// `create` is only called when no usable worker is registered. It may
    /// be called more than once if construction races with another client
    /// or fails transiently; every redundant worker is released.
    ///
    /// # Errors
    ///
    /// - [`SingletonError::InvalidKey`] before any remote call.
    /// - [`SingletonError::Construction`] when the scheduler rejects the
    ///   construction. Nothing is published.
    /// - [`SingletonError::RetriesExhausted`] when transient failures outlast
    ///   the retry budget.
    /// - [`SingletonError::Registry`] or [`SingletonError::Scheduler`] for
    ///   terminal backend failures.
    pub async fn get<F>(&self, key: &str, create: F, options: GetOptions) -> Result<WorkerHandle, SingletonError>
    where
        F: Fn() -> W::Spec + Send + Sync,
    {
        self.validate_key(key)?;
        let mut budget = RetryBudget::new(&self.config);

        loop {
            let attempt = budget.begin_attempt();
            let (reason, backoff) = match self.get_attempt(key, &create, &options, attempt).await {
                Ok(Attempt::Ready(handle)) => return Ok(handle),
                Ok(Attempt::Retry { reason, backoff }) => (reason, backoff),
                Err(e) if e.is_transient() => (e.to_string(), true),
                Err(e) => return Err(e),
            };

            let delay = if backoff {
                budget.next_delay()
            } else if budget.has_remaining() {
                Some(std::time::Duration::ZERO)
            } else {
                None
            };

            match delay {
                Some(delay) => {
                    debug!(key, attempt, backoff_ms = duration_to_ms(delay), %reason, "retrying singleton get");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                None => {
                    warn!(key, attempts = budget.attempts(), %reason, "singleton get retries exhausted");
                    return RetriesExhaustedSnafu {
                        key,
                        attempts: budget.attempts(),
                        reason,
                    }
                    .fail();
                }
            }
        }
    }

    async fn get_attempt<F>(
        &self,
        key: &str,
        create: &F,
        options: &GetOptions,
        attempt: u32,
    ) -> Result<Attempt<WorkerHandle>, SingletonError>
    where
        F: Fn() -> W::Spec + Send + Sync,
    {
        let predecessor = match self.registry.read(key).await? {
            RegistryRead::Absent => {
                debug!(key, attempt, "no singleton registered");
                Predecessor::default()
            }
            RegistryRead::Corrupted { raw, reason } => {
                warn!(key, %reason, "replacing corrupted singleton record");
                Predecessor {
                    raw: Some(raw),
                    ..Predecessor::default()
                }
            }
            RegistryRead::Present(snapshot) => {
                let record = &snapshot.record;
                let now = self.now_ms();
                if record.is_expired(now) {
                    info!(key, version = record.version, handle = %record.handle, "singleton expired, replacing");
                    snapshot.into()
                } else {
                    let liveness = self.liveness.confirm(&record.handle).await.context(SchedulerSnafu { key })?;
                    match liveness {
                        Liveness::Alive => {
                            self.touch(key, &snapshot).await;
                            return Ok(Attempt::Ready(snapshot.record.handle));
                        }
                        Liveness::Dead => {
                            info!(key, version = record.version, handle = %record.handle, "singleton worker is gone, replacing");
                            snapshot.into()
                        }
                        Liveness::Inconclusive => {
                            return Ok(Attempt::backoff(format!("worker {} did not answer liveness probes", record.handle)));
                        }
                    }
                }
            }
        };

        self.recreate(key, create, options, attempt, predecessor).await
    }

    async fn recreate<F>(
        &self,
        key: &str,
        create: &F,
        options: &GetOptions,
        attempt: u32,
        predecessor: Predecessor,
    ) -> Result<Attempt<WorkerHandle>, SingletonError>
    where
        F: Fn() -> W::Spec + Send + Sync,
    {
        let priority = options.priority.unwrap_or(self.config.default_priority);
        debug!(key, attempt, priority = priority.value(), "constructing singleton worker");
        let spec = create();
        let construction = self.scheduler.submit_construction(spec, priority);
        let handle = match tokio::time::timeout(self.config.attempt_timeout(), construction).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) if e.is_transient() => return Ok(Attempt::backoff(format!("construction failed: {e}"))),
            Ok(Err(source)) => return Err(source).context(ConstructionSnafu { key, attempt }),
            Err(_) => return Ok(Attempt::backoff("construction timed out")),
        };

        let version = compute_next_version(predecessor.version);
        debug_assert!(
            predecessor.version.is_none_or(|previous| version > previous),
            "SINGLETON: version must increase on recreation"
        );
        let record = SingletonRecord::new(key, handle.clone(), version, self.now_ms(), options);

        match self.registry.write_if(key, predecessor.raw.as_deref(), &record).await {
            Ok(WriteOutcome::Written) => {
                self.published(key, &record, predecessor.handle.as_ref()).await;
                Ok(Attempt::Ready(handle))
            }
            Ok(WriteOutcome::Conflict) => {
                self.release_best_effort(key, &handle, "lost construction race").await;
                self.adopt_winner(key).await
            }
            Err(e) if e.is_transient() => self.resolve_ambiguous_write(key, &record, predecessor.handle.as_ref(), e).await,
            Err(e) => {
                self.release_best_effort(key, &handle, "registry write failed").await;
                Err(e)
            }
        }
    }

    async fn published(&self, key: &str, record: &SingletonRecord, superseded: Option<&WorkerHandle>) {
        info!(key, version = record.version, handle = %record.handle, "published singleton");
        if let Some(old) = superseded
            && *old != record.handle
        {
            self.release_best_effort(key, old, "superseded").await;
        }
    }

    /// After losing a race, return the winner's handle if it is usable.
    async fn adopt_winner(&self, key: &str) -> Result<Attempt<WorkerHandle>, SingletonError> {
        let RegistryRead::Present(snapshot) = self.registry.read(key).await? else {
            return Ok(Attempt::immediate("winning record disappeared"));
        };
        let winner = snapshot.record;
        if winner.is_expired(self.now_ms()) {
            return Ok(Attempt::immediate("winning record already expired"));
        }
        let liveness = self.liveness.confirm(&winner.handle).await.context(SchedulerSnafu { key })?;
        match liveness {
            Liveness::Alive => {
                debug!(key, version = winner.version, handle = %winner.handle, "adopted concurrent winner");
                Ok(Attempt::Ready(winner.handle))
            }
            Liveness::Dead => Ok(Attempt::immediate("winning worker is gone")),
            Liveness::Inconclusive => Ok(Attempt::backoff(format!(
                "winning worker {} did not answer liveness probes",
                winner.handle
            ))),
        }
    }

    /// A publish failed transiently, so it may or may not have landed.
    async fn resolve_ambiguous_write(
        &self,
        key: &str,
        record: &SingletonRecord,
        superseded: Option<&WorkerHandle>,
        error: SingletonError,
    ) -> Result<Attempt<WorkerHandle>, SingletonError> {
        match self.registry.read(key).await {
            Ok(RegistryRead::Present(snapshot)) if snapshot.record.handle == record.handle => {
                self.published(key, record, superseded).await;
                Ok(Attempt::Ready(snapshot.record.handle))
            }
            Ok(_) => {
                self.release_best_effort(key, &record.handle, "registry write did not land").await;
                Ok(Attempt::backoff(error.to_string()))
            }
            Err(read_error) => {
                // Unknown outcome. A published but released worker is caught by
                // the next liveness probe.
                debug!(key, error = %read_error, "could not resolve ambiguous registry write");
                self.release_best_effort(key, &record.handle, "registry write outcome unknown").await;
                Ok(Attempt::backoff(error.to_string()))
            }
        }
    }

    /// Refresh the idle deadline of a record that is being handed out.
    ///
    /// Losing the compare means another client updated the record, which
    /// refreshes it just as well.
    async fn touch(&self, key: &str, snapshot: &RecordSnapshot) {
        if snapshot.record.idle_ttl_ms.is_none() {
            return;
        }
        let touched = snapshot.record.touched(self.now_ms());
        if let Err(e) = self.registry.write_if(key, Some(&snapshot.raw), &touched).await {
            debug!(key, error = %e, "failed to refresh singleton access time");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use singleton_cluster_types::Priority;
    use singleton_cluster_types::SchedulerError;
    use singleton_testing::DeterministicKeyValueStore;
    use singleton_testing::DeterministicScheduler;
    use singleton_testing::FaultInjectingKeyValueStore;
    use singleton_testing::Interference;
    use singleton_testing::WorkerSpec;
    use singleton_time::SimulatedTimeProvider;

    use super::*;
    use crate::config::SingletonConfig;

    type Coordinator = SingletonCoordinator<DeterministicKeyValueStore, DeterministicScheduler>;

    fn fast_config() -> SingletonConfig {
        SingletonConfig {
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            ..Default::default()
        }
    }

    fn setup() -> (Coordinator, Arc<DeterministicKeyValueStore>, Arc<DeterministicScheduler>, SimulatedTimeProvider) {
        let store = DeterministicKeyValueStore::new();
        let scheduler = DeterministicScheduler::new();
        let time = SimulatedTimeProvider::new(1_000_000);
        let coordinator =
            SingletonCoordinator::with_time_provider(store.clone(), scheduler.clone(), fast_config(), Arc::new(time.clone()))
                .unwrap();
        (coordinator, store, scheduler, time)
    }

    type RacyStore = FaultInjectingKeyValueStore<DeterministicKeyValueStore>;

    /// Coordinator over a store that can stage a competing publish.
    fn racy_setup(
        config: SingletonConfig,
    ) -> (SingletonCoordinator<RacyStore, DeterministicScheduler>, Arc<RacyStore>, Arc<DeterministicScheduler>) {
        let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
        let scheduler = DeterministicScheduler::new();
        let time = SimulatedTimeProvider::new(1_000_000);
        let coordinator =
            SingletonCoordinator::with_time_provider(store.clone(), scheduler.clone(), config, Arc::new(time)).unwrap();
        (coordinator, store, scheduler)
    }

    /// Raw record as another client would have published it.
    fn rival_record(handle: &WorkerHandle, version: u64, created_at_ms: u64, options: &GetOptions) -> String {
        serde_json::to_string(&SingletonRecord::new("svc", handle.clone(), version, created_at_ms, options)).unwrap()
    }

    fn spec() -> WorkerSpec {
        WorkerSpec::new("svc")
    }

    #[tokio::test]
    async fn test_cold_get_then_cached_hit() {
        let (coordinator, _store, scheduler, _time) = setup();

        let first = coordinator.get("svc", spec, GetOptions::new().with_ttl(Duration::from_secs(3600))).await.unwrap();
        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.handle, first);

        let second = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(scheduler.construction_count(), 1);
    }

    #[tokio::test]
    async fn test_dead_worker_is_replaced() {
        let (coordinator, _store, scheduler, _time) = setup();
        let first = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        scheduler.kill(&first);

        let second = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        assert_ne!(second, first);
        assert_eq!(coordinator.inspect("svc").await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_ttl_expiry_replaces_live_worker() {
        let (coordinator, _store, scheduler, time) = setup();
        let options = GetOptions::new().with_ttl(Duration::from_millis(500));
        let first = coordinator.get("svc", spec, options.clone()).await.unwrap();

        time.advance_ms(500);
        assert_eq!(coordinator.get("svc", spec, options.clone()).await.unwrap(), first);

        time.advance_ms(1);
        let second = coordinator.get("svc", spec, options).await.unwrap();
        assert_ne!(second, first);
        // The expired worker was alive, so it is released once superseded.
        assert!(!scheduler.is_alive(&first));
        assert!(scheduler.is_alive(&second));
    }

    #[tokio::test]
    async fn test_construction_failure_publishes_nothing() {
        let (coordinator, _store, scheduler, _time) = setup();
        let err = coordinator.get("svc", || WorkerSpec::failing("svc", "bad config"), GetOptions::new()).await.unwrap_err();

        match err {
            SingletonError::Construction { attempt, source, .. } => {
                assert_eq!(attempt, 1);
                assert!(source.to_string().contains("bad config"));
            }
            other => panic!("expected construction error, got {other:?}"),
        }
        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
        assert_eq!(scheduler.live_workers(), 0);
    }

    #[tokio::test]
    async fn test_transient_construction_failure_is_retried() {
        let (coordinator, _store, scheduler, _time) = setup();
        scheduler.fail_next_constructions(2);

        coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        assert_eq!(scheduler.construction_attempts(), 3);
        assert_eq!(scheduler.construction_count(), 1);
    }

    #[tokio::test]
    async fn test_priority_defaults_to_high() {
        let (coordinator, _store, scheduler, _time) = setup();
        coordinator.get("a", spec, GetOptions::new()).await.unwrap();
        coordinator.get("b", spec, GetOptions::new().with_priority(Priority::LOW)).await.unwrap();
        assert_eq!(scheduler.priorities(), vec![Priority::HIGH, Priority::LOW]);
    }

    #[tokio::test]
    async fn test_corrupted_record_replaced_with_version_one() {
        let (coordinator, store, _scheduler, _time) = setup();
        store.set_raw("__singleton:svc", "{garbage").await;

        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.handle, handle);
    }

    #[tokio::test]
    async fn test_idle_ttl_refreshed_by_hits() {
        let (coordinator, _store, _scheduler, time) = setup();
        let options = GetOptions::new().with_idle_ttl(Duration::from_millis(100));
        let first = coordinator.get("svc", spec, options.clone()).await.unwrap();

        for _ in 0..5 {
            time.advance_ms(80);
            assert_eq!(coordinator.get("svc", spec, options.clone()).await.unwrap(), first);
        }
        assert_eq!(coordinator.inspect("svc").await.unwrap().unwrap().version, 1);

        time.advance_ms(101);
        assert_ne!(coordinator.get("svc", spec, options).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_unresponsive_worker_exhausts_retries() {
        let scheduler = DeterministicScheduler::new();
        let config = SingletonConfig {
            max_attempts: 2,
            probe_timeout_ms: 5,
            probe_attempts: 1,
            ..fast_config()
        };
        let coordinator = SingletonCoordinator::new(DeterministicKeyValueStore::new(), scheduler.clone(), config).unwrap();

        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        scheduler.hang_probes(&handle);

        let err = coordinator.get("svc", spec, GetOptions::new()).await.unwrap_err();
        assert!(err.is_retries_exhausted(), "{err}");
        // Inconclusive is never treated as dead.
        assert_eq!(scheduler.construction_count(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_write_adopts_landed_record() {
        let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
        store.fail_writes_after_apply(1);
        let scheduler = DeterministicScheduler::new();
        let coordinator = SingletonCoordinator::new(store.clone(), scheduler.clone(), fast_config()).unwrap();

        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        assert_eq!(coordinator.inspect("svc").await.unwrap().unwrap().handle, handle);
        assert_eq!(scheduler.construction_count(), 1);
        assert_eq!(scheduler.release_count(), 0);
    }

    #[tokio::test]
    async fn test_terminal_probe_error_surfaces() {
        let (coordinator, _store, scheduler, _time) = setup();
        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();
        scheduler.set_probe_error(
            &handle,
            SchedulerError::Rejected {
                reason: "forbidden".to_string(),
            },
        );

        let err = coordinator.get("svc", spec, GetOptions::new()).await.unwrap_err();
        assert!(matches!(err, SingletonError::Scheduler { .. }));
    }

    #[tokio::test]
    async fn test_lost_race_to_dead_winner_recreates_over_it() {
        let (coordinator, store, scheduler) = racy_setup(fast_config());
        let ghost = WorkerHandle::new("worker-ghost", "node-9");
        store.interfere_before_next_conditional_write(Interference::Replace(rival_record(
            &ghost,
            7,
            1_000_000,
            &GetOptions::new(),
        )));

        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();

        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        assert_eq!(record.version, 8);
        assert_eq!(record.handle, handle);
        assert_eq!(scheduler.construction_count(), 2);
        assert_eq!(scheduler.live_workers(), 1);
        assert!(scheduler.is_alive(&handle));
    }

    #[tokio::test]
    async fn test_lost_race_to_expired_winner_recreates_over_it() {
        let (coordinator, store, scheduler) = racy_setup(fast_config());
        let rival = scheduler.submit_construction(WorkerSpec::new("rival"), Priority::HIGH).await.unwrap();
        let expired = GetOptions::new().with_ttl(Duration::from_millis(10));
        store.interfere_before_next_conditional_write(Interference::Replace(rival_record(&rival, 7, 0, &expired)));

        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();

        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        assert_eq!(record.version, 8);
        assert_eq!(record.handle, handle);
        // The expired rival is superseded and released; our race loser too.
        assert!(!scheduler.is_alive(&rival));
        assert_eq!(scheduler.live_workers(), 1);
    }

    #[tokio::test]
    async fn test_lost_race_to_vanished_winner_starts_over() {
        let (coordinator, store, scheduler) = racy_setup(fast_config());
        let ghost = WorkerHandle::new("worker-ghost", "node-9");
        store.interfere_before_next_conditional_write(Interference::Replace(rival_record(
            &ghost,
            7,
            1_000_000,
            &GetOptions::new(),
        )));
        store.interfere_after_next_conditional_write(Interference::Remove);

        let handle = coordinator.get("svc", spec, GetOptions::new()).await.unwrap();

        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.handle, handle);
        assert_eq!(scheduler.construction_count(), 2);
        assert_eq!(scheduler.live_workers(), 1);
    }

    #[tokio::test]
    async fn test_lost_race_to_unresponsive_winner_is_not_replaced() {
        let config = SingletonConfig {
            max_attempts: 2,
            probe_timeout_ms: 5,
            probe_attempts: 1,
            ..fast_config()
        };
        let (coordinator, store, scheduler) = racy_setup(config);
        let rival = scheduler.submit_construction(WorkerSpec::new("rival"), Priority::HIGH).await.unwrap();
        scheduler.hang_probes(&rival);
        store.interfere_before_next_conditional_write(Interference::Replace(rival_record(
            &rival,
            7,
            1_000_000,
            &GetOptions::new(),
        )));

        let err = coordinator.get("svc", spec, GetOptions::new()).await.unwrap_err();
        assert!(err.is_retries_exhausted(), "{err}");

        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        assert_eq!(record.version, 7);
        assert_eq!(record.handle, rival);
        // Only the rival survives: our constructed worker lost the race.
        assert_eq!(scheduler.live_workers(), 1);
        assert!(scheduler.is_alive(&rival));
    }
}
