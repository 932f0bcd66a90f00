//! Capability traits for singleton coordination.
//!
//! The coordinator never talks to a concrete registry or scheduler. It
//! consumes two capabilities:
//!
//! - [`KeyValueStore`]: the cluster-wide registry where handles are published
//! - [`WorkerScheduler`]: the runtime that constructs, probes and releases workers

use async_trait::async_trait;
use singleton_cluster_types::Priority;
use singleton_cluster_types::SchedulerError;
use singleton_cluster_types::WorkerHandle;
use singleton_kv_types::DeleteRequest;
use singleton_kv_types::DeleteResult;
use singleton_kv_types::KeyValueStoreError;
use singleton_kv_types::ReadRequest;
use singleton_kv_types::ReadResult;
use singleton_kv_types::WriteRequest;
use singleton_kv_types::WriteResult;

/// Distributed key-value store interface.
///
/// Must survive the death of any single client and provide linearizable
/// compare-and-swap.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Apply a write command.
    ///
    /// A compare that does not hold returns
    /// [`KeyValueStoreError::CompareAndSwapFailed`].
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError>;

    /// Read a value by key with revision metadata.
    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError>;

    /// Delete a key. Deleting a missing key succeeds with `is_deleted = false`.
    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError> {
        (**self).write(request).await
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        (**self).read(request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError> {
        (**self).delete(request).await
    }
}

/// Cluster scheduler interface.
///
/// `Spec` is the construction request the caller's `create` callback
/// produces: a named computation with arguments, a container image, or
/// whatever the runtime accepts. The coordinator never inspects it.
#[async_trait]
pub trait WorkerScheduler: Send + Sync {
    /// Caller-defined description of the worker to construct.
    type Spec: Send + 'static;

    /// Construct a worker and return its handle once construction succeeded.
    ///
    /// `priority` biases scheduling order under contention.
    async fn submit_construction(&self, spec: Self::Spec, priority: Priority) -> Result<WorkerHandle, SchedulerError>;

    /// Lightweight no-op call confirming the worker is alive and reachable.
    async fn probe(&self, handle: &WorkerHandle) -> Result<(), SchedulerError>;

    /// Request destruction of the worker. Best-effort from the caller's side.
    async fn release(&self, handle: &WorkerHandle) -> Result<(), SchedulerError>;
}

#[async_trait]
impl<T: WorkerScheduler + ?Sized> WorkerScheduler for std::sync::Arc<T> {
    type Spec = T::Spec;

    async fn submit_construction(&self, spec: Self::Spec, priority: Priority) -> Result<WorkerHandle, SchedulerError> {
        (**self).submit_construction(spec, priority).await
    }

    async fn probe(&self, handle: &WorkerHandle) -> Result<(), SchedulerError> {
        (**self).probe(handle).await
    }

    async fn release(&self, handle: &WorkerHandle) -> Result<(), SchedulerError> {
        (**self).release(handle).await
    }
}
