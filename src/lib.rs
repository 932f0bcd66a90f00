//! Cluster-wide singleton workers.
//!
//! Facade over the `singleton-*` crates plus the layered configuration used
//! by the `actor-singleton` binary.
//!
//! ```ignore
//! use actor_singleton::{GetOptions, SingletonConfig, SingletonCoordinator};
//!
//! let coordinator = SingletonCoordinator::new(store, scheduler, SingletonConfig::default())?;
//! let handle = coordinator.get("session-cache", make_spec, GetOptions::new()).await?;
//! ```

pub mod config;

pub use config::AppConfig;
pub use config::ConfigOverlay;
pub use config::ConfigError;
pub use singleton_cluster_types::Priority;
pub use singleton_cluster_types::SchedulerError;
pub use singleton_cluster_types::WorkerHandle;
pub use singleton_coordination::GetOptions;
pub use singleton_coordination::SingletonConfig;
pub use singleton_coordination::SingletonCoordinator;
pub use singleton_coordination::SingletonError;
pub use singleton_coordination::SingletonRecord;
pub use singleton_kv_types::KeyValueStoreError;
pub use singleton_time::SystemTimeProvider;
pub use singleton_time::TimeProvider;
pub use singleton_traits::KeyValueStore;
pub use singleton_traits::WorkerScheduler;

/// Registry and scheduler implementations for tests and local simulation.
pub mod testing {
    pub use singleton_testing::DeterministicKeyValueStore;
    pub use singleton_testing::DeterministicScheduler;
    pub use singleton_testing::FaultInjectingKeyValueStore;
    pub use singleton_testing::Interference;
    pub use singleton_testing::WorkerSpec;
}
