use std::env;
use std::time::Duration;

/// API client configuration.
///
/// Reads from the `STRATPLAN_API_URL` environment variable, falling back to
/// `http://localhost:8000/api` when unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix, without a trailing slash.
    pub base_url: String,
    pub timeout_secs: u64,
    /// Total attempts for a GET, including the first.
    pub query_attempts: u32,
}

impl ApiConfig {
    pub const DEFAULT_URL: &str = "http://localhost:8000/api";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
    pub const DEFAULT_QUERY_ATTEMPTS: u32 = 2;

    /// Build a config from the environment.
    ///
    /// Priority: `STRATPLAN_API_URL` env var, then the compile-time default.
    /// `STRATPLAN_API_TIMEOUT` overrides the timeout when it parses.
    pub fn from_env() -> Self {
        let base_url =
            env::var("STRATPLAN_API_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        let timeout_secs = env::var("STRATPLAN_API_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        Self {
            timeout_secs,
            ..Self::new(base_url)
        }
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            query_attempts: Self::DEFAULT_QUERY_ATTEMPTS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute URL for an API path such as `/plans/`.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url() {
        let cfg = ApiConfig::new(ApiConfig::DEFAULT_URL);
        assert_eq!(cfg.base_url, "http://localhost:8000/api");
        assert_eq!(cfg.query_attempts, 2);
    }

    #[test]
    fn trailing_slash_trimmed() {
        let cfg = ApiConfig::new("https://plan.example.org/api/");
        assert_eq!(cfg.endpoint("/plans/"), "https://plan.example.org/api/plans/");
        assert_eq!(cfg.endpoint("plans/"), "https://plan.example.org/api/plans/");
    }

    #[test]
    fn timeout_duration() {
        let mut cfg = ApiConfig::new("http://x/api");
        cfg.timeout_secs = 30;
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }
}
