//! Environment variable utilities

/// Get environment variable or return default value
///
/// # Example
/// ```rust
/// use brd_api::utils::env_or_default;
///
/// let port = env_or_default("PORT", "unknown");
/// ```
pub fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get environment variable as Option
///
/// Returns `Some(value)` if set, `None` if not set.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_or_default() {
        std::env::remove_var("BRD_API_TEST_UNSET");
        assert_eq!(env_or_default("BRD_API_TEST_UNSET", "fallback"), "fallback");
        assert_eq!(env_opt("BRD_API_TEST_UNSET"), None);

        std::env::set_var("BRD_API_TEST_SET", "8080");
        assert_eq!(env_or_default("BRD_API_TEST_SET", "fallback"), "8080");
        assert_eq!(env_opt("BRD_API_TEST_SET").as_deref(), Some("8080"));
        std::env::remove_var("BRD_API_TEST_SET");
    }
}
