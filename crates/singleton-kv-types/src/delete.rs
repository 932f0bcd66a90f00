//! Delete operation types.

use serde::Deserialize;
use serde::Serialize;

/// Request to delete a key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteRequest {
    pub key: String,
}

impl DeleteRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Result of a delete operation.
///
/// Deletes are idempotent: removing a missing key succeeds with
/// `is_deleted = false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub key: String,
    #[serde(alias = "deleted")]
    pub is_deleted: bool,
}
