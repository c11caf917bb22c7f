//! Error types for docflow.

use thiserror::Error;

/// Result type alias using docflow's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A required creation field was missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Flow not found
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    /// The external document service returned a non-success status.
    /// Status and body are passed through transparently to aid debugging.
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// Webhook signature missing, malformed, or incorrect.
    #[error("Signature error: {0}")]
    Signature(String),

    /// Reconciliation poller exhausted its retry budget without finding
    /// the new file. Must be surfaced to the caller, never swallowed.
    #[error("Reconciliation timed out: {0}")]
    ReconciliationTimeout(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Snapshot persistence error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("missing template_file_id".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: missing template_file_id"
        );
    }

    #[test]
    fn test_error_display_upstream_carries_status_and_body() {
        let err = Error::Upstream {
            status: 403,
            body: "insufficient permissions".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream error (403): insufficient permissions"
        );
    }

    #[test]
    fn test_error_display_signature() {
        let err = Error::Signature("header mismatch".to_string());
        assert_eq!(err.to_string(), "Signature error: header mismatch");
    }

    #[test]
    fn test_error_display_reconciliation_timeout() {
        let err = Error::ReconciliationTimeout("no new file after 8 attempts".to_string());
        assert!(err.to_string().contains("Reconciliation timed out"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot missing");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
