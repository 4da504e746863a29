//! Client configuration.
//!
//! `ClientConfig` deserializes with defaults so a host application can embed
//! it in its own configuration file, and [`ClientConfig::from_env`] builds one
//! from `URLSCAN_*` variables.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Public API root of the hosted service.
pub const DEFAULT_BASE_URL: &str = "https://urlscan.io/api/v1";

const ENV_API_KEY: &str = "URLSCAN_API_KEY";
const ENV_BASE_URL: &str = "URLSCAN_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "URLSCAN_TIMEOUT_SECS";

/// Service credential. Never printed in full.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for the request header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// First four characters followed by an ellipsis.
    pub fn masked(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}…")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Settings needed to talk to the scan service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://urlscan.io/api/v1`.
    pub base_url: String,
    pub api_key: ApiKey,
    /// Upper bound for a single HTTP exchange, in milliseconds. `None`
    /// leaves requests unbounded; waits are bounded by `WaitContext` instead.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: ApiKey::default(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Millisecond precision; anything shorter than 1 ms becomes 1 ms.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.request_timeout_ms = Some(millis.max(1));
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads `URLSCAN_API_KEY` (required), `URLSCAN_BASE_URL` and
    /// `URLSCAN_TIMEOUT_SECS`.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingApiKey` when no key is set and
    /// `ConfigError::InvalidValue` when a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(ENV_API_KEY).ok_or(ConfigError::MissingApiKey)?;
        let mut config = Self::new(api_key);

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            tracing::debug!(base_url = %base_url, "override base_url from env");
            config.base_url = base_url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                field: ENV_TIMEOUT_SECS.to_string(),
                reason: e.to_string(),
            })?;
            config.request_timeout_ms = Some(secs.saturating_mul(1000));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce working requests.
    ///
    /// # Errors
    /// Returns `ConfigError` for an empty key or a base URL that is not
    /// http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                reason: format!("expected an http(s) URL, got {:?}", self.base_url),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
