//! Key-value types for the shared singleton registry.
//!
//! The registry is any cluster-wide, crash-tolerant key-value store that
//! offers linearizable reads, compare-and-swap and idempotent deletes. These
//! types describe that capability independently of the backend.

mod delete;
mod error;
mod read;
mod validation;
mod write;

pub use delete::DeleteRequest;
pub use delete::DeleteResult;
pub use error::KeyValueStoreError;
pub use read::ReadRequest;
pub use read::ReadResult;
use serde::Deserialize;
use serde::Serialize;
pub use validation::validate_key;
pub use validation::validate_write_command;
pub use write::WriteCommand;
pub use write::WriteRequest;
pub use write::WriteResult;

/// A stored value together with its revision metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValueWithRevision {
    pub key: String,
    pub value: String,
    /// Store revision at which the key was created.
    pub create_revision: u64,
    /// Store revision of the last modification.
    pub mod_revision: u64,
}
