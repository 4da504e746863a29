//! Error types for the scan service client.
//!
//! # Design
//! Each variant maps to one failure class a caller handles differently:
//! local encoding problems, infrastructure failures (`Transport`), responses
//! that could not be read (`Decode`), refusals by the service (`Rejected`),
//! and the terminal outcomes of waiting on a task (`Timeout`, `Cancelled`).
//! "Report not ready yet" is never surfaced; the poll loop consumes it.

use thiserror::Error;

use crate::task::{CancelReason, TaskState};
use crate::transport::TransportError;

/// Errors returned by `UrlscanClient` operations.
#[derive(Error, Debug)]
pub enum UrlscanError {
    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request: {0}")]
    Encoding(#[source] serde_json::Error),

    /// No usable response: connection, DNS, TLS or body read failure.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The response body is not the JSON document the service promises.
    #[error("failed to decode response with status {status}: {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The service understood the request and refused it.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// A success response lacked a field the client depends on.
    #[error("response is missing `{field}`")]
    MissingField { field: &'static str },

    /// Every poll attempt came back "not ready".
    #[error("timed out waiting for the report of task {uuid} after {attempts} attempts")]
    Timeout { uuid: String, attempts: u32 },

    /// The caller aborted the wait.
    #[error("waiting for task {uuid} was cancelled: {reason}")]
    Cancelled { uuid: String, reason: CancelReason },

    /// The task already reached a terminal failure state.
    #[error("task {uuid} already finished as {state:?}")]
    TaskFinished { uuid: String, state: TaskState },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl UrlscanError {
    /// HTTP status associated with the failure, `-1` when no response was
    /// received at all, `None` for purely local failures.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            UrlscanError::Transport(err) => Some(err.status_code()),
            UrlscanError::Decode { status, .. } | UrlscanError::Rejected { status, .. } => {
                Some(i32::from(*status))
            }
            _ => None,
        }
    }

    /// True for the errors that end a task's lifecycle for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UrlscanError::Rejected { .. }
                | UrlscanError::Timeout { .. }
                | UrlscanError::TaskFinished { .. }
        )
    }
}

/// Errors raised while assembling a `ClientConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no API key configured (set URLSCAN_API_KEY)")]
    MissingApiKey,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, UrlscanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_carries_status() {
        let err = UrlscanError::Rejected {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.to_string(), "request rejected with status 429: slow down");
        assert!(err.is_terminal());
    }

    #[test]
    fn timeout_names_the_task() {
        let err = UrlscanError::Timeout {
            uuid: "abc-123".to_string(),
            attempts: 30,
        };
        assert!(err.to_string().contains("abc-123"));
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn decode_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = UrlscanError::Decode { status: 502, source };
        assert_eq!(err.status_code(), Some(502));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_terminal());
    }
}
