//! Cluster-wide singleton workers over a compare-and-swap registry.
//!
//! A [`SingletonCoordinator`] hands out the handle of the single live worker
//! registered under a key, constructing one through the
//! [`WorkerScheduler`](singleton_traits::WorkerScheduler) when the key is
//! absent, expired or points at a dead worker. Publication is a conditional
//! write against the registry, so concurrent callers anywhere in the cluster
//! agree on exactly one winner; losers release the worker they built.
//!
//! ## Modules
//!
//! - [`pure`]: deterministic backoff, expiry and key layout functions
//! - [`registry`]: typed, conditional access to registry records
//! - [`liveness`]: bounded liveness probes
//! - [`coordinator`]: `get`, `discard` and `inspect`
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use singleton_coordination::{GetOptions, SingletonConfig, SingletonCoordinator};
//!
//! let coordinator = SingletonCoordinator::new(store, scheduler, SingletonConfig::default())?;
//! let handle = coordinator
//!     .get("session-cache", || spec.clone(), GetOptions::new().with_ttl(Duration::from_secs(3600)))
//!     .await?;
//! coordinator.discard("session-cache").await?;
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod liveness;
pub mod pure;
pub mod registry;
pub mod retry;
pub mod types;

pub use config::SingletonConfig;
pub use coordinator::SingletonCoordinator;
pub use error::SingletonError;
pub use liveness::Liveness;
pub use liveness::LivenessChecker;
pub use registry::RecordSnapshot;
pub use registry::RegistryAccessor;
pub use registry::RegistryRead;
pub use registry::WriteOutcome;
pub use retry::RetryBudget;
pub use types::GetOptions;
pub use types::SingletonRecord;
