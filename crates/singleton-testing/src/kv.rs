use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use singleton_kv_types::DeleteRequest;
use singleton_kv_types::DeleteResult;
use singleton_kv_types::KeyValueStoreError;
use singleton_kv_types::KeyValueWithRevision;
use singleton_kv_types::ReadRequest;
use singleton_kv_types::ReadResult;
use singleton_kv_types::WriteCommand;
use singleton_kv_types::WriteRequest;
use singleton_kv_types::WriteResult;
use singleton_kv_types::validate_write_command;
use singleton_traits::KeyValueStore;
use tokio::sync::RwLock;

#[derive(Clone)]
struct VersionedValue {
    value: String,
    create_revision: u64,
    mod_revision: u64,
}

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, VersionedValue>,
    revision: u64,
}

/// A deterministic in-memory key-value store for testing.
///
/// Every write holds one lock for the compare and the update, so
/// compare-and-swap is linearizable across concurrent tasks.
#[derive(Default)]
pub struct DeterministicKeyValueStore {
    inner: RwLock<Inner>,
}

impl DeterministicKeyValueStore {
    /// Create a new deterministic store wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raw stored value, bypassing the trait.
    pub async fn get_raw(&self, key: &str) -> Option<String> {
        self.inner.read().await.data.get(key).map(|v| v.value.clone())
    }

    /// Store a raw value unconditionally, e.g. to plant a corrupted record.
    pub async fn set_raw(&self, key: &str, value: &str) {
        let mut inner = self.inner.write().await;
        let revision = inner.bump();
        inner.put(key, value, revision);
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.data.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn put(&mut self, key: &str, value: &str, revision: u64) {
        let create_revision = self.data.get(key).map_or(revision, |v| v.create_revision);
        self.data.insert(key.to_string(), VersionedValue {
            value: value.to_string(),
            create_revision,
            mod_revision: revision,
        });
    }
}

#[async_trait]
impl KeyValueStore for DeterministicKeyValueStore {
    async fn write(&self, request: WriteRequest) -> Result<WriteResult, KeyValueStoreError> {
        validate_write_command(&request.command)?;
        let mut inner = self.inner.write().await;

        match &request.command {
            WriteCommand::Set { key, value } => {
                let revision = inner.bump();
                inner.put(key, value, revision);
            }
            WriteCommand::CompareAndSwap {
                key,
                expected,
                new_value,
            } => {
                let current = inner.data.get(key).map(|v| v.value.clone());
                if current.as_ref() != expected.as_ref() {
                    return Err(KeyValueStoreError::CompareAndSwapFailed {
                        key: key.clone(),
                        expected: expected.clone(),
                        actual: current,
                    });
                }
                let revision = inner.bump();
                inner.put(key, new_value, revision);
            }
            WriteCommand::CompareAndDelete { key, expected } => {
                let current = inner.data.get(key).map(|v| v.value.clone());
                if current.as_ref() != Some(expected) {
                    return Err(KeyValueStoreError::CompareAndSwapFailed {
                        key: key.clone(),
                        expected: Some(expected.clone()),
                        actual: current,
                    });
                }
                inner.bump();
                inner.data.remove(key);
            }
        }

        Ok(WriteResult {
            command: Some(request.command),
            revision: inner.revision,
        })
    }

    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        let inner = self.inner.read().await;
        Ok(ReadResult {
            kv: inner.data.get(&request.key).map(|v| KeyValueWithRevision {
                key: request.key.clone(),
                value: v.value.clone(),
                create_revision: v.create_revision,
                mod_revision: v.mod_revision,
            }),
        })
    }

    async fn delete(&self, request: DeleteRequest) -> Result<DeleteResult, KeyValueStoreError> {
        let mut inner = self.inner.write().await;
        let is_deleted = inner.data.remove(&request.key).is_some();
        if is_deleted {
            inner.bump();
        }
        Ok(DeleteResult {
            key: request.key,
            is_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cas_on_absent_key() {
        let store = DeterministicKeyValueStore::new();
        store.write(WriteRequest::compare_and_swap("k", None, "v1")).await.unwrap();

        let err = store.write(WriteRequest::compare_and_swap("k", None, "v2")).await.unwrap_err();
        assert_eq!(err, KeyValueStoreError::CompareAndSwapFailed {
            key: "k".to_string(),
            expected: None,
            actual: Some("v1".to_string()),
        });
        assert_eq!(store.get_raw("k").await.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_revisions_track_modifications() {
        let store = DeterministicKeyValueStore::new();
        store.write(WriteRequest::compare_and_swap("k", None, "v1")).await.unwrap();
        store.write(WriteRequest::compare_and_swap("k", Some("v1".into()), "v2")).await.unwrap();

        let kv = store.read(ReadRequest::new("k")).await.unwrap().kv.unwrap();
        assert_eq!(kv.create_revision, 1);
        assert_eq!(kv.mod_revision, 2);
    }

    #[tokio::test]
    async fn test_compare_and_delete() {
        let store = DeterministicKeyValueStore::new();
        store.set_raw("k", "v").await;

        assert!(store.write(WriteRequest::compare_and_delete("k", "other")).await.is_err());
        store.write(WriteRequest::compare_and_delete("k", "v")).await.unwrap();
        assert!(store.is_empty().await);

        let err = store.write(WriteRequest::compare_and_delete("k", "v")).await.unwrap_err();
        assert!(matches!(err, KeyValueStoreError::CompareAndSwapFailed { actual: None, .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = DeterministicKeyValueStore::new();
        store.set_raw("k", "v").await;
        assert!(store.delete(DeleteRequest::new("k")).await.unwrap().is_deleted);
        assert!(!store.delete(DeleteRequest::new("k")).await.unwrap().is_deleted);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let store = DeterministicKeyValueStore::new();
        let err = store.write(WriteRequest::compare_and_swap("", None, "v")).await.unwrap_err();
        assert_eq!(err, KeyValueStoreError::EmptyKey);
    }
}
