//! Write operation types.

use serde::Deserialize;
use serde::Serialize;

/// Commands for modifying registry state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WriteCommand {
    /// Set a single key-value pair unconditionally.
    Set { key: String, value: String },
    /// Compare-and-swap: atomically replace the value if the current value
    /// matches `expected`. `expected: None` means the key must not exist.
    CompareAndSwap {
        key: String,
        expected: Option<String>,
        new_value: String,
    },
    /// Compare-and-delete: atomically delete the key if the current value
    /// matches `expected`.
    CompareAndDelete { key: String, expected: String },
}

impl WriteCommand {
    /// The key this command targets.
    pub fn key(&self) -> &str {
        match self {
            WriteCommand::Set { key, .. }
            | WriteCommand::CompareAndSwap { key, .. }
            | WriteCommand::CompareAndDelete { key, .. } => key,
        }
    }
}

/// Request wrapping a single write command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteRequest {
    pub command: WriteCommand,
}

impl WriteRequest {
    /// Build an unconditional set request.
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            command: WriteCommand::Set {
                key: key.into(),
                value: value.into(),
            },
        }
    }

    /// Build a compare-and-swap request.
    pub fn compare_and_swap(key: impl Into<String>, expected: Option<String>, new_value: impl Into<String>) -> Self {
        Self {
            command: WriteCommand::CompareAndSwap {
                key: key.into(),
                expected,
                new_value: new_value.into(),
            },
        }
    }

    /// Build a compare-and-delete request.
    pub fn compare_and_delete(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            command: WriteCommand::CompareAndDelete {
                key: key.into(),
                expected: expected.into(),
            },
        }
    }
}

/// Result of an applied write.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteResult {
    pub command: Option<WriteCommand>,
    /// Store revision assigned to the write.
    pub revision: u64,
}
