//! Discard.

use singleton_cluster_types::WorkerHandle;
use singleton_traits::KeyValueStore;
use singleton_traits::WorkerScheduler;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SingletonCoordinator;
use crate::error::RetriesExhaustedSnafu;
use crate::error::SingletonError;
use crate::pure::duration_to_ms;
use crate::registry::RegistryRead;
use crate::registry::WriteOutcome;
use crate::retry::Attempt;
use crate::retry::RetryBudget;

impl<K: KeyValueStore + ?Sized, W: WorkerScheduler + ?Sized> SingletonCoordinator<K, W> {
    /// Remove the singleton registered under `key`.
    ///
    /// Idempotent: discarding an absent key succeeds. The worker is released
    /// best-effort when `release_on_discard` is set; release failures are
    /// logged and never returned. A handle is released at most once per
    /// call, even when the record changes underneath and the delete retries.
    pub async fn discard(&self, key: &str) -> Result<(), SingletonError> {
        self.validate_key(key)?;
        let mut budget = RetryBudget::new(&self.config);
        let mut released = None;

        loop {
            let attempt = budget.begin_attempt();
            let (reason, backoff) = match self.discard_attempt(key, &mut released).await {
                Ok(Attempt::Ready(())) => return Ok(()),
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
            let Some(delay) = delay else {
                warn!(key, attempts = budget.attempts(), %reason, "singleton discard retries exhausted");
                return RetriesExhaustedSnafu {
                    key,
                    attempts: budget.attempts(),
                    reason,
                }
                .fail();
            };
            debug!(key, attempt, backoff_ms = duration_to_ms(delay), %reason, "retrying singleton discard");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn discard_attempt(
        &self,
        key: &str,
        released: &mut Option<WorkerHandle>,
    ) -> Result<Attempt<()>, SingletonError> {
        let raw = match self.registry.read(key).await? {
            RegistryRead::Absent => {
                debug!(key, "discard of absent singleton");
                return Ok(Attempt::Ready(()));
            }
            RegistryRead::Corrupted { raw, reason } => {
                warn!(key, %reason, "discarding corrupted singleton record");
                raw
            }
            RegistryRead::Present(snapshot) => {
                let handle = &snapshot.record.handle;
                if self.config.release_on_discard && released.as_ref() != Some(handle) {
                    self.release_best_effort(key, handle, "discarded").await;
                    *released = Some(handle.clone());
                }
                snapshot.raw
            }
        };

        match self.registry.delete_if(key, &raw).await? {
            WriteOutcome::Written => {
                info!(key, "discarded singleton");
                Ok(Attempt::Ready(()))
            }
            WriteOutcome::Conflict => Ok(Attempt::immediate("singleton record changed during discard")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use singleton_cluster_types::Priority;
    use singleton_kv_types::KeyValueStoreError;
    use singleton_testing::DeterministicKeyValueStore;
    use singleton_testing::DeterministicScheduler;
    use singleton_testing::FaultInjectingKeyValueStore;
    use singleton_testing::Interference;
    use singleton_testing::WorkerSpec;

    use super::*;
    use crate::config::SingletonConfig;
    use crate::types::GetOptions;
    use crate::types::SingletonRecord;

    fn config() -> SingletonConfig {
        SingletonConfig {
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_discard_is_idempotent() {
        let scheduler = DeterministicScheduler::new();
        let coordinator = SingletonCoordinator::new(DeterministicKeyValueStore::new(), scheduler.clone(), config()).unwrap();

        coordinator.discard("svc").await.unwrap();
        let handle = coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();
        coordinator.discard("svc").await.unwrap();
        coordinator.discard("svc").await.unwrap();

        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
        assert!(!scheduler.is_alive(&handle));
        assert_eq!(scheduler.release_count(), 1);
    }

    #[tokio::test]
    async fn test_discard_without_release_keeps_worker() {
        let scheduler = DeterministicScheduler::new();
        let config = SingletonConfig {
            release_on_discard: false,
            ..config()
        };
        let coordinator = SingletonCoordinator::new(DeterministicKeyValueStore::new(), scheduler.clone(), config).unwrap();

        let handle = coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();
        coordinator.discard("svc").await.unwrap();

        assert!(scheduler.is_alive(&handle));
        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
        let next = coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();
        assert_ne!(next, handle);
    }

    #[tokio::test]
    async fn test_release_failure_is_swallowed() {
        let scheduler = DeterministicScheduler::new();
        let coordinator = SingletonCoordinator::new(DeterministicKeyValueStore::new(), scheduler.clone(), config()).unwrap();
        coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();

        scheduler.fail_releases(true);
        coordinator.discard("svc").await.unwrap();
        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_discard_corrupted_record() {
        let store = DeterministicKeyValueStore::new();
        store.set_raw("__singleton:svc", "nope").await;
        let coordinator = SingletonCoordinator::new(store.clone(), DeterministicScheduler::new(), config()).unwrap();

        coordinator.discard("svc").await.unwrap();
        assert_eq!(store.get_raw("__singleton:svc").await, None);
    }

    #[tokio::test]
    async fn test_discard_retries_transient_delete() {
        let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
        let scheduler = DeterministicScheduler::new();
        let coordinator = SingletonCoordinator::new(store.clone(), scheduler.clone(), config()).unwrap();
        coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();

        store.fail_writes(2);
        coordinator.discard("svc").await.unwrap();
        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
        assert_eq!(scheduler.release_count(), 1);
    }

    #[tokio::test]
    async fn test_discard_survives_touch_before_delete() {
        let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
        let scheduler = DeterministicScheduler::new();
        let coordinator = SingletonCoordinator::new(store.clone(), scheduler.clone(), config()).unwrap();
        let handle = coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();

        // Another client refreshes the access time between our read and delete.
        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        let touched = serde_json::to_string(&record.touched(record.last_accessed_ms + 5)).unwrap();
        store.interfere_before_next_conditional_write(Interference::Replace(touched));

        coordinator.discard("svc").await.unwrap();

        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
        assert!(!scheduler.is_alive(&handle));
        assert_eq!(scheduler.release_count(), 1);
    }

    #[tokio::test]
    async fn test_discard_survives_recreation_before_delete() {
        let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
        let scheduler = DeterministicScheduler::new();
        let coordinator = SingletonCoordinator::new(store.clone(), scheduler.clone(), config()).unwrap();
        let first = coordinator.get("svc", || WorkerSpec::new("svc"), GetOptions::new()).await.unwrap();

        // Another client replaces the worker between our read and delete.
        let replacement = scheduler.submit_construction(WorkerSpec::new("svc"), Priority::HIGH).await.unwrap();
        let record = coordinator.inspect("svc").await.unwrap().unwrap();
        let recreated =
            SingletonRecord::new("svc", replacement.clone(), record.version + 1, record.created_at_ms, &GetOptions::new());
        store.interfere_before_next_conditional_write(Interference::Replace(serde_json::to_string(&recreated).unwrap()));

        coordinator.discard("svc").await.unwrap();

        assert_eq!(coordinator.inspect("svc").await.unwrap(), None);
        assert!(!scheduler.is_alive(&first));
        assert!(!scheduler.is_alive(&replacement));
        assert_eq!(scheduler.release_count(), 2);
    }

    #[tokio::test]
    async fn test_discard_terminal_registry_error() {
        let store = Arc::new(FaultInjectingKeyValueStore::new(DeterministicKeyValueStore::new()));
        store.set_error(KeyValueStoreError::Failed {
            reason: "disk full".to_string(),
        });
        store.fail_reads(1);
        let coordinator = SingletonCoordinator::new(store, DeterministicScheduler::new(), config()).unwrap();

        let err = coordinator.discard("svc").await.unwrap_err();
        assert!(matches!(err, SingletonError::Registry { .. }));
    }
}
