//! Registry key layout.

/// Registry key under which the singleton `key` is published.
///
/// ```ignore
/// assert_eq!(singleton_key("__singleton:", "svc"), "__singleton:svc");
/// ```
#[inline]
pub fn singleton_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_key() {
        assert_eq!(singleton_key("__singleton:", "svc"), "__singleton:svc");
        assert_eq!(singleton_key("", "svc"), "svc");
    }
}
