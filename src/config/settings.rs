//! Engine settings: API endpoint, credentials and polling behaviour.
//!
//! Settings are an explicit value handed to the client and poller
//! constructors. Nothing here is process-global.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default delay between two describe calls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Root settings for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Ambar API client settings.
    pub client: ClientConfig,
    /// Polling settings.
    #[serde(default)]
    pub polling: PollConfig,
}

/// Ambar API client settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Regional Ambar API endpoint.
    pub endpoint: String,
    /// Environment API key.
    pub api_key: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Polling settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    /// Seconds between two describe calls.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Optional overall deadline per wait, in seconds. Unbounded when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl EngineConfig {
    /// Creates settings for an endpoint and key with default polling.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: ClientConfig::new(endpoint, api_key),
            polling: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates client settings with the default request timeout.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Endpoint without trailing slashes.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

impl PollConfig {
    /// Interval between describe calls.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Overall deadline per wait, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
