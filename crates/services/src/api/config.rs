use std::env;
use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for the learning backend.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `TRAIL_API_BASE_URL`, `TRAIL_API_TOKEN` and `TRAIL_API_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidConfig` when the timeout is not a positive integer
    /// or the base URL is blank.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ApiError> {
        let base_url = lookup("TRAIL_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        if base_url.trim().is_empty() {
            return Err(ApiError::InvalidConfig(
                "TRAIL_API_BASE_URL must not be empty".into(),
            ));
        }

        let timeout = match lookup("TRAIL_API_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ApiError::InvalidConfig(format!(
                        "TRAIL_API_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                    )));
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let mut config = Self::new(base_url.trim()).with_timeout(timeout);
        if let Some(token) = lookup("TRAIL_API_TOKEN") {
            config = config.with_token(token);
        }
        Ok(config)
    }

    /// Join `path` onto the base URL, or pass absolute URLs through.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.token.is_none());
    }

    #[test]
    fn reads_overrides_and_ignores_blank_token() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("TRAIL_API_BASE_URL", "https://learn.example.com/api/"),
            ("TRAIL_API_TIMEOUT_SECS", "15"),
            ("TRAIL_API_TOKEN", "  "),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.token.is_none());
        assert_eq!(
            config.url("/assessment/checkpoint/skip"),
            "https://learn.example.com/api/assessment/checkpoint/skip"
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = ApiConfig::from_lookup(lookup(&[("TRAIL_API_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }

    #[test]
    fn absolute_urls_pass_through() {
        let config = ApiConfig::default();
        assert_eq!(config.url("https://other.host/x"), "https://other.host/x");
    }
}
