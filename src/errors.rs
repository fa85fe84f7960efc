//! Typed error hierarchy for the trike client.
//!
//! Three top-level enums cover the three subsystems:
//! - `CountdownError`: target parsing and synchronizer lifecycle
//! - `ApiError`: dispatch-status HTTP requests
//! - `RealtimeError`: channel subscriptions and the socket connection

use thiserror::Error;

/// Errors from the countdown synchronizer.
#[derive(Debug, Error)]
pub enum CountdownError {
    #[error("Invalid timestamp '{input}': {source}")]
    InvalidTimestamp {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Countdown has been disposed")]
    Disposed,

    #[error("No tokio runtime available to drive the countdown")]
    NoRuntime,
}

/// Errors from the dispatch-status API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API URL '{0}'")]
    InvalidUrl(String),

    #[error("Request to dispatch API failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Dispatch API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode dispatch response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Errors from the realtime channel layer.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Channel name must not be empty")]
    EmptyChannel,

    #[error("Failed to connect to socket server at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("Failed to encode realtime frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Realtime channel service has shut down")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_error_invalid_timestamp_carries_input() {
        let source = chrono::DateTime::parse_from_rfc3339("not a time").unwrap_err();
        let err = CountdownError::InvalidTimestamp {
            input: "not a time".to_string(),
            source,
        };
        match &err {
            CountdownError::InvalidTimestamp { input, .. } => assert_eq!(input, "not a time"),
            _ => panic!("Expected InvalidTimestamp"),
        }
        assert!(err.to_string().contains("not a time"));
    }

    #[test]
    fn api_error_status_carries_code() {
        let err = ApiError::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("maintenance"));
    }

    #[test]
    fn realtime_error_variants_are_distinct() {
        assert!(matches!(RealtimeError::Closed, RealtimeError::Closed));
        assert!(!matches!(RealtimeError::EmptyChannel, RealtimeError::Closed));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&CountdownError::Disposed);
        assert_std_error(&ApiError::InvalidUrl("x".into()));
        assert_std_error(&RealtimeError::Closed);
    }
}
