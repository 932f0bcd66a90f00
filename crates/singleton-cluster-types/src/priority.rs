use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use singleton_constants::coordination::DEFAULT_CONSTRUCTION_PRIORITY;

/// Scheduling hint for worker construction.
///
/// Passed through to the scheduler unchanged. Higher values are more urgent;
/// the scale is whatever the scheduler defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    /// Ahead of background work. Used when a caller gives no hint.
    pub const HIGH: Priority = Priority(DEFAULT_CONSTRUCTION_PRIORITY);
    pub const NORMAL: Priority = Priority(0);
    /// Behind already-queued work.
    pub const LOW: Priority = Priority(-1);

    pub fn value(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::HIGH
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::HIGH > Priority::NORMAL);
        assert!(Priority::NORMAL > Priority::LOW);
    }

    #[test]
    fn test_default_is_high() {
        assert_eq!(Priority::default(), Priority::HIGH);
    }

    #[test]
    fn test_priority_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Priority(-3)).unwrap(), "-3");
    }
}
