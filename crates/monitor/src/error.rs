//! Error types for the execution monitor.

use std::time::Duration;
use thiserror::Error;

use crate::model::{FetchCursor, Target};

/// Errors that can abort a wait or drain.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Target id unknown to the manager.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials valid but not allowed to read the target.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The local wait gave up; the remote execution keeps running.
    #[error(
        "Timed out waiting for {} after {}s ({} events read)",
        .cursor.target,
        .elapsed.as_secs(),
        .cursor.next_offset
    )]
    Timeout {
        cursor: FetchCursor,
        elapsed: Duration,
    },

    /// Connection failure, request timeout or server-side unavailability.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success response that retrying will not fix.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The caller's sink failed while handling a batch.
    #[error("Event sink failed: {0}")]
    Sink(#[source] anyhow::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using MonitorError.
pub type MonitorResult<T> = Result<T, MonitorError>;

impl MonitorError {
    /// Only transport failures are eligible for local retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, MonitorError::Transport(_))
    }

    /// The target the timeout was raised for, if this is a timeout.
    pub fn timed_out_target(&self) -> Option<&Target> {
        match self {
            MonitorError::Timeout { cursor, .. } => Some(&cursor.target),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MonitorError::Decode(e.to_string())
        } else if e.is_builder() {
            MonitorError::Config(e.to_string())
        } else {
            MonitorError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        MonitorError::Decode(e.to_string())
    }
}

impl From<envy::Error> for MonitorError {
    fn from(e: envy::Error) -> Self {
        MonitorError::Config(e.to_string())
    }
}
