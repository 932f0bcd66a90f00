//! Deterministic in-memory backends for singleton coordination tests.
//!
//! - [`DeterministicKeyValueStore`]: linearizable in-memory registry
//! - [`FaultInjectingKeyValueStore`]: wrapper that injects faults and staged races
//! - [`DeterministicScheduler`]: in-memory worker scheduler with kill switches
//!
//! All constructors return `Arc<Self>`-friendly types so the same instance
//! can be shared by several coordinators, the way independent clients share
//! one cluster.

mod faulty;
mod kv;
mod scheduler;

pub use faulty::FaultInjectingKeyValueStore;
pub use faulty::Interference;
pub use kv::DeterministicKeyValueStore;
pub use scheduler::DeterministicScheduler;
pub use scheduler::WorkerSpec;
