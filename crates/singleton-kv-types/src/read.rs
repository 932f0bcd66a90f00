//! Read operation types.

use serde::Deserialize;
use serde::Serialize;

use crate::KeyValueWithRevision;

/// Request to read a single key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadRequest {
    pub key: String,
}

impl ReadRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Response from a read operation.
///
/// `kv` is `None` when the key does not exist. Stores may also report a
/// missing key as [`KeyValueStoreError::NotFound`](crate::KeyValueStoreError::NotFound);
/// callers must accept both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadResult {
    pub kv: Option<KeyValueWithRevision>,
}

impl ReadResult {
    /// The stored value, if the key exists.
    pub fn into_value(self) -> Option<String> {
        self.kv.map(|kv| kv.value)
    }
}
