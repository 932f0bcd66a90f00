use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use singleton_kv_types::DeleteRequest;
use singleton_kv_types::DeleteResult;
use singleton_kv_types::KeyValueStoreError;
use singleton_kv_types::ReadRequest;
use singleton_kv_types::ReadResult;
use singleton_kv_types::WriteCommand;
use singleton_kv_types::WriteRequest;
use singleton_kv_types::WriteResult;
use singleton_traits::KeyValueStore;
use tracing::debug;

/// A change made to a key by a simulated competing client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interference {
    /// Overwrite the key with this raw value.
    Replace(String),
    /// Remove the key.
    Remove,
}

/// Wraps a store and injects failures into its calls.
///
/// Failure budgets count down per operation kind: `fail_reads(2)` fails the
/// next two reads, then reads pass through again. The injected error is
/// [`KeyValueStoreError::Unavailable`] unless replaced with [`set_error`](Self::set_error).
///
/// Races are staged with [`interfere_before_next_conditional_write`](Self::interfere_before_next_conditional_write)
/// and its `after` counterpart, which change the targeted key just before or
/// just after the next compare-and-swap or compare-and-delete.
pub struct FaultInjectingKeyValueStore<S: KeyValueStore + ?Sized> {
    inner: Arc<S>,
    error: Mutex<KeyValueStoreError>,
    failing_reads: AtomicU32,
    failing_writes: AtomicU32,
    /// Writes that are applied and then reported as failed.
    lost_write_acks: AtomicU32,
    before_conditional: Mutex<Option<Interference>>,
    after_conditional: Mutex<Option<Interference>>,
    latency_ms: AtomicU64,
    reads: AtomicU64,
    injected: AtomicU64,
}

impl<S: KeyValueStore + ?Sized> FaultInjectingKeyValueStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            error: Mutex::new(KeyValueStoreError::Unavailable {
                reason: "injected fault".to_string(),
            }),
            failing_reads: AtomicU32::new(0),
            failing_writes: AtomicU32::new(0),
            lost_write_acks: AtomicU32::new(0),
            before_conditional: Mutex::new(None),
            after_conditional: Mutex::new(None),
            latency_ms: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            injected: AtomicU64::new(0),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Replace the error returned by injected failures.
    pub fn set_error(&self, error: KeyValueStoreError) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    pub fn fail_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Apply the next `count` writes but report them as failed, so the caller
    /// cannot tell whether they landed.
    pub fn fail_writes_after_apply(&self, count: u32) {
        self.lost_write_acks.store(count, Ordering::SeqCst);
    }

    /// Change the target key right before the next conditional write runs,
    /// so the write sees a value its caller never read.
    pub fn interfere_before_next_conditional_write(&self, change: Interference) {
        *self.before_conditional.lock().unwrap_or_else(PoisonError::into_inner) = Some(change);
    }

    /// Change the target key right after the next conditional write runs,
    /// whatever its outcome.
    pub fn interfere_after_next_conditional_write(&self, change: Interference) {
        *self.after_conditional.lock().unwrap_or_else(PoisonError::into_inner) = Some(change);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(latency_ms, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Total number of injected failures so far.
    pub fn injected_count(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let latency_ms = self.latency_ms.load(Ordering::SeqCst);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
    }

    async fn before_call(&self, budget: &AtomicU32, op: &str) -> Result<(), KeyValueStoreError> {
        self.delay().await;
        if take_one(budget) {
            return Err(self.inject(op));
        }
        Ok(())
    }

    fn inject(&self, op: &str) -> KeyValueStoreError {
        self.injected.fetch_add(1, Ordering::SeqCst);
        let error = self.error.lock().unwrap_or_else(PoisonError::into_inner).clone();
        debug!(op, %error, "injecting registry fault");
        error
    }

    async fn interfere(&self, slot: &Mutex<Option<Interference>>, key: &str) -> Result<(), KeyValueStoreError> {
        let change = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match change {
            Some(Interference::Replace(value)) => {
                debug!(key, "replacing value around conditional write");
                self.inner.write(WriteRequest::set(key, value)).await?;
            }
            Some(Interference::Remove) => {
                debug!(key, "removing value around conditional write");
                self.inner.delete(DeleteRequest::new(key)).await?;
            }
            None => {}
        }
        Ok(())
    }
}

/// Decrement `budget` if positive. Returns whether a unit was taken.
fn take_one(budget: &AtomicU32) -> bool {
    budget.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for FaultInjectingKeyValueStore<S> {
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError> {
        self.before_call(&self.failing_writes, "write").await?;

        let conditional_key = match &request.command {
            WriteCommand::CompareAndSwap { .. } | WriteCommand::CompareAndDelete { .. } => {
                Some(request.command.key().to_string())
            }
            WriteCommand::Set { .. } => None,
        };
        if let Some(key) = &conditional_key {
            self.interfere(&self.before_conditional, key).await?;
        }
        let result = self.inner.write(request).await;
        if let Some(key) = &conditional_key {
            self.interfere(&self.after_conditional, key).await?;
        }

        let result = result?;
        if take_one(&self.lost_write_acks) {
            return Err(self.inject("write ack"));
        }
        Ok(result)
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.before_call(&self.failing_reads, "read").await?;
        self.inner.read(request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError> {
        self.delay().await;
        self.inner.delete(request).await
    }
}
