//! Validation functions for registry writes.

use singleton_constants::api::MAX_KEY_SIZE;
use singleton_constants::api::MAX_VALUE_SIZE;

use crate::KeyValueStoreError;
use crate::write::WriteCommand;

/// Validate a key against the fixed size limits.
pub fn validate_key(key: &str) -> Result<(), KeyValueStoreError> {
    if key.is_empty() {
        return Err(KeyValueStoreError::EmptyKey);
    }
    let len = key.len();
    if len > MAX_KEY_SIZE as usize {
        return Err(KeyValueStoreError::KeyTooLarge {
            size: len as u32,
            max: MAX_KEY_SIZE,
        });
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<(), KeyValueStoreError> {
    let len = value.len();
    if len > MAX_VALUE_SIZE as usize {
        return Err(KeyValueStoreError::ValueTooLarge {
            size: len as u32,
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(())
}

/// Validate a write command against fixed size limits.
pub fn validate_write_command(command: &WriteCommand) -> Result<(), KeyValueStoreError> {
    match command {
        WriteCommand::Set { key, value } => {
            validate_key(key)?;
            validate_value(value)
        }
        WriteCommand::CompareAndSwap { key, new_value, .. } => {
            validate_key(key)?;
            validate_value(new_value)
        }
        WriteCommand::CompareAndDelete { key, .. } => validate_key(key),
    }
}
