//! Typed access to singleton records in the shared registry.
//!
//! Records are stored as JSON. Every conditional write compares against the
//! exact raw value that was read, so two writers can never both succeed
//! from the same observation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use singleton_kv_types::DeleteRequest;
use singleton_kv_types::KeyValueStoreError;
use singleton_kv_types::ReadRequest;
use singleton_kv_types::WriteRequest;
use singleton_traits::KeyValueStore;
use snafu::ResultExt;
use tracing::debug;

use crate::error::RegistrySnafu;
use crate::error::SerializationSnafu;
use crate::error::SingletonError;
use crate::pure::duration_to_ms;
use crate::pure::singleton_key;
use crate::types::SingletonRecord;

/// A record as read, together with the exact bytes it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub record: SingletonRecord,
    /// Raw registry value; the expected value for a follow-up compare-and-swap.
    pub raw: String,
}

/// Result of reading a singleton key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryRead {
    Absent,
    Present(RecordSnapshot),
    /// A value exists but does not decode as a record.
    Corrupted { raw: String, reason: String },
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The stored value no longer matched the expected value.
    Conflict,
}

/// Registry accessor scoped to the singleton key prefix.
pub struct RegistryAccessor<S: KeyValueStore + ?Sized> {
    store: Arc<S>,
    prefix: String,
    call_timeout: Duration,
}

impl<S: KeyValueStore + ?Sized> RegistryAccessor<S> {
    pub fn new(store: Arc<S>, prefix: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            call_timeout,
        }
    }

    /// Full registry key for a singleton key.
    pub fn registry_key(&self, key: &str) -> String {
        singleton_key(&self.prefix, key)
    }

    /// Read the record for `key`.
    pub async fn read(&self, key: &str) -> Result<RegistryRead, SingletonError> {
        let registry_key = self.registry_key(key);
        let result = self.timed(self.store.read(ReadRequest::new(registry_key))).await;

        let raw = match result {
            Ok(result) => match result.into_value() {
                Some(raw) => raw,
                None => return Ok(RegistryRead::Absent),
            },
            Err(KeyValueStoreError::NotFound { .. }) => return Ok(RegistryRead::Absent),
            Err(source) => return Err(source).context(RegistrySnafu { key }),
        };

        match serde_json::from_str::<SingletonRecord>(&raw) {
            Ok(record) => Ok(RegistryRead::Present(RecordSnapshot { record, raw })),
            Err(e) => Ok(RegistryRead::Corrupted {
                raw,
                reason: e.to_string(),
            }),
        }
    }

    /// Publish `record` if the stored value still equals `expected_raw`.
    ///
    /// `expected_raw: None` requires the key to be absent.
    pub async fn write_if(
        &self,
        key: &str,
        expected_raw: Option<&str>,
        record: &SingletonRecord,
    ) -> Result<WriteOutcome, SingletonError> {
        let new_value = serde_json::to_string(record).context(SerializationSnafu { key })?;
        let request = WriteRequest::compare_and_swap(self.registry_key(key), expected_raw.map(str::to_string), new_value);

        match self.timed(self.store.write(request)).await {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(KeyValueStoreError::CompareAndSwapFailed { .. }) => {
                debug!(key, "registry compare-and-swap conflict");
                Ok(WriteOutcome::Conflict)
            }
            Err(source) => Err(source).context(RegistrySnafu { key }),
        }
    }

    /// Remove `key` only if it still holds `expected_raw`.
    ///
    /// A key that is already gone counts as removed.
    pub async fn delete_if(&self, key: &str, expected_raw: &str) -> Result<WriteOutcome, SingletonError> {
        let request = WriteRequest::compare_and_delete(self.registry_key(key), expected_raw);

        match self.timed(self.store.write(request)).await {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(KeyValueStoreError::CompareAndSwapFailed { actual: None, .. }) => Ok(WriteOutcome::Written),
            Err(KeyValueStoreError::NotFound { .. }) => Ok(WriteOutcome::Written),
            Err(KeyValueStoreError::CompareAndSwapFailed { .. }) => Ok(WriteOutcome::Conflict),
            Err(source) => Err(source).context(RegistrySnafu { key }),
        }
    }

    /// Remove `key` unconditionally. Returns whether a value was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, SingletonError> {
        match self.timed(self.store.delete(DeleteRequest::new(self.registry_key(key)))).await {
            Ok(result) => Ok(result.is_deleted),
            Err(KeyValueStoreError::NotFound { .. }) => Ok(false),
            Err(source) => Err(source).context(RegistrySnafu { key }),
        }
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, KeyValueStoreError>>,
    ) -> Result<T, KeyValueStoreError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(KeyValueStoreError::Timeout {
                duration_ms: duration_to_ms(self.call_timeout),
            }),
        }
    }
}
