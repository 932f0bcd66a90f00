//! The singleton coordinator.
//!
//! Stateless apart from configuration: every decision is made from a fresh
//! registry read, so any number of coordinators on any number of nodes can
//! serve the same keys.

mod discard;
mod get;

use std::sync::Arc;

use singleton_cluster_types::WorkerHandle;
use singleton_constants::api::MAX_KEY_SIZE;
use singleton_time::SystemTimeProvider;
use singleton_time::TimeProvider;
use singleton_traits::KeyValueStore;
use singleton_traits::WorkerScheduler;
use tracing::debug;
use tracing::warn;

use crate::config::SingletonConfig;
use crate::error::InvalidKeySnafu;
use crate::error::SingletonError;
use crate::liveness::LivenessChecker;
use crate::registry::RegistryAccessor;
use crate::registry::RegistryRead;
use crate::types::SingletonRecord;

/// Get-or-create coordinator for cluster singleton workers.
///
/// # Example
///
/// ```ignore
/// let coordinator = SingletonCoordinator::new(store, scheduler, SingletonConfig::default())?;
/// let handle = coordinator
///     .get("session-cache", || WorkerSpec::new("session-cache"), GetOptions::new())
///     .await?;
/// ```
pub struct SingletonCoordinator<K: KeyValueStore + ?Sized, W: WorkerScheduler + ?Sized> {
    registry: RegistryAccessor<K>,
    liveness: LivenessChecker<W>,
    scheduler: Arc<W>,
    time: Arc<dyn TimeProvider>,
    config: SingletonConfig,
}

impl<K: KeyValueStore + ?Sized, W: WorkerScheduler + ?Sized> SingletonCoordinator<K, W> {
    /// Create a coordinator that reads wall-clock time from the system.
    pub fn new(store: Arc<K>, scheduler: Arc<W>, config: SingletonConfig) -> Result<Self, SingletonError> {
        Self::with_time_provider(store, scheduler, config, Arc::new(SystemTimeProvider))
    }

    /// Create a coordinator with an explicit time source for record timestamps.
    pub fn with_time_provider(
        store: Arc<K>,
        scheduler: Arc<W>,
        config: SingletonConfig,
        time: Arc<dyn TimeProvider>,
    ) -> Result<Self, SingletonError> {
        config.validate()?;
        Ok(Self {
            registry: RegistryAccessor::new(store, config.key_prefix.clone(), config.attempt_timeout()),
            liveness: LivenessChecker::new(scheduler.clone(), config.probe_timeout(), config.probe_attempts),
            scheduler,
            time,
            config,
        })
    }

    pub fn config(&self) -> &SingletonConfig {
        &self.config
    }

    /// Current record for `key`, without probing or repairing it.
    ///
    /// A corrupted record is reported as `None`.
    pub async fn inspect(&self, key: &str) -> Result<Option<SingletonRecord>, SingletonError> {
        self.validate_key(key)?;
        match self.registry.read(key).await? {
            RegistryRead::Present(snapshot) => Ok(Some(snapshot.record)),
            RegistryRead::Absent => Ok(None),
            RegistryRead::Corrupted { reason, .. } => {
                warn!(key, %reason, "registry holds a corrupted singleton record");
                Ok(None)
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.time.now_unix_ms()
    }

    fn validate_key(&self, key: &str) -> Result<(), SingletonError> {
        if key.is_empty() {
            return InvalidKeySnafu {
                key,
                reason: "key must not be empty",
            }
            .fail();
        }
        let full_len = self.config.key_prefix.len().saturating_add(key.len());
        if full_len > MAX_KEY_SIZE as usize {
            return InvalidKeySnafu {
                key,
                reason: format!("registry key is {full_len} bytes, limit is {MAX_KEY_SIZE}"),
            }
            .fail();
        }
        Ok(())
    }

    /// Ask the scheduler to destroy a worker. Never fails the caller.
    async fn release_best_effort(&self, key: &str, handle: &WorkerHandle, reason: &str) {
        match tokio::time::timeout(self.config.attempt_timeout(), self.scheduler.release(handle)).await {
            Ok(Ok(())) => debug!(key, %handle, %reason, "released worker"),
            Ok(Err(e)) => warn!(key, %handle, %reason, error = %e, "failed to release worker"),
            Err(_) => warn!(key, %handle, %reason, "timed out releasing worker"),
        }
    }
}
