//! Reasoner configuration.
//!
//! Environment-sourced; no config file is required to run degraded (a
//! missing API key simply pins every turn to the local fallback path).

use std::env;
use std::time::Duration;

/// Default base URL of the Gemini `generateContent` REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1/models";

/// Ordered candidate models, tried first to last.
pub const DEFAULT_MODELS: [&str; 2] = ["gemini-1.5-flash", "gemini-1.5-pro"];

/// Per-attempt timeout for one candidate call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for the remote reasoning backend.
#[derive(Debug, Clone)]
pub struct ReasonerConfig {
    /// API key credential; `None` means the remote path is unavailable.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Fixed-priority candidate list; exhausted in order, no backoff.
    pub models: Vec<String>,
    pub timeout: Duration,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ReasonerConfig {
    /// Loads configuration from environment variables.
    ///
    /// - `GEMINI_API_KEY` - credential (optional; absence degrades)
    /// - `IRIS_REASONER_URL` - base URL override
    /// - `IRIS_REASONER_MODELS` - comma-separated candidate override
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(url) = env::var("IRIS_REASONER_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(models) = env::var("IRIS_REASONER_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            if !models.is_empty() {
                config.models = models;
            }
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidate_order_is_fixed() {
        let config = ReasonerConfig::default();
        assert_eq!(config.models, vec!["gemini-1.5-flash", "gemini-1.5-pro"]);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ReasonerConfig::default()
            .with_api_key("k")
            .with_base_url("http://localhost:9090")
            .with_timeout(Duration::from_secs(1));
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.base_url, "http://localhost:9090");
        assert_eq!(config.timeout, Duration::from_secs(1));
    }
}
