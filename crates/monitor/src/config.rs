//! Monitor configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::error::MonitorResult;

/// What to do when a status poll or event fetch hits a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientErrorPolicy {
    /// Retry on the normal poll cadence, giving up after this many
    /// consecutive failures.
    Retry { max_consecutive: u32 },
    /// Propagate the first transport error.
    FailFast,
}

impl TransientErrorPolicy {
    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn allows_retry(&self, failures: u32) -> bool {
        match self {
            TransientErrorPolicy::Retry { max_consecutive } => failures < *max_consecutive,
            TransientErrorPolicy::FailFast => false,
        }
    }
}

impl Default for TransientErrorPolicy {
    fn default() -> Self {
        TransientErrorPolicy::Retry {
            max_consecutive: default_transient_retry_limit(),
        }
    }
}

/// Core wait-loop settings.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Fixed sleep between iterations, independent of the timeout.
    pub poll_interval: Duration,

    /// Events requested per page.
    pub page_size: u64,

    pub transient_errors: TransientErrorPolicy,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(default_poll_interval_ms()),
            page_size: default_events_page_size(),
            transient_errors: TransientErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientErrorMode {
    Retry,
    FailFast,
}

/// Monitor configuration loaded from environment variables.
///
/// Environment variables are prefixed with `CFY_`:
/// - `CFY_MANAGER_URL`: Manager REST endpoint (default: "http://localhost:80")
/// - `CFY_TOKEN`: Authentication token (optional)
/// - `CFY_TENANT`: Tenant name (optional)
/// - `CFY_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
/// - `CFY_POLL_INTERVAL_MS`: Sleep between polls (default: 3000)
/// - `CFY_EVENTS_PAGE_SIZE`: Events per page (default: 100)
/// - `CFY_TRANSIENT_ERRORS`: `retry` or `fail_fast` (default: retry)
/// - `CFY_TRANSIENT_RETRY_LIMIT`: Consecutive transport failures tolerated (default: 10)
/// - `CFY_WAIT_TIMEOUT_SECS`: Default wait timeout (default: 900)
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_manager_url")]
    pub manager_url: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub tenant: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_events_page_size")]
    pub events_page_size: u64,

    #[serde(default = "default_transient_errors")]
    pub transient_errors: TransientErrorMode,

    #[serde(default = "default_transient_retry_limit")]
    pub transient_retry_limit: u32,

    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
}

fn default_manager_url() -> String {
    "http://localhost:80".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_events_page_size() -> u64 {
    100
}

fn default_transient_errors() -> TransientErrorMode {
    TransientErrorMode::Retry
}

fn default_transient_retry_limit() -> u32 {
    10
}

fn default_wait_timeout_secs() -> u64 {
    900
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> MonitorResult<Self> {
        Ok(envy::prefixed("CFY_").from_env::<MonitorConfig>()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// The subset of settings the wait engine needs.
    pub fn wait_config(&self) -> WaitConfig {
        let transient_errors = match self.transient_errors {
            TransientErrorMode::Retry => TransientErrorPolicy::Retry {
                max_consecutive: self.transient_retry_limit,
            },
            TransientErrorMode::FailFast => TransientErrorPolicy::FailFast,
        };

        WaitConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            page_size: self.events_page_size.max(1),
            transient_errors,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            manager_url: default_manager_url(),
            token: None,
            tenant: None,
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            events_page_size: default_events_page_size(),
            transient_errors: default_transient_errors(),
            transient_retry_limit: default_transient_retry_limit(),
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}
