//! Error types for fbk-admin
//!
//! Propagation policy:
//! - `FetchError` is surfaced to the dashboard, which offers a retry
//! - `StreamParseError` and `StreamTransportError` are recovered inside the
//!   subscriber (log and discard / reconnect) and never end the subscription

use fbk_common::api::ApiError;
use thiserror::Error;

/// Bulk load failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Backend unreachable
    #[error("Failed to connect to backend server: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("Backend returned HTTP {status}")]
    Status { status: u16 },

    /// Body was not a JSON array of reviews
    #[error("Invalid review listing: {0}")]
    Decode(String),

    /// Another load for this view is still running
    #[error("A review load is already in progress")]
    InProgress,

    /// The view (and its store) has been shut down
    #[error("Admin view has been shut down")]
    TornDown,

    /// Local failure installing the listing, e.g. a poisoned store lock
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FetchError {
    /// Human-readable reason shown next to the retry action
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => FetchError::Network(msg),
            ApiError::Status { status, .. } => FetchError::Status { status },
            ApiError::Decode(msg) => FetchError::Decode(msg),
        }
    }
}

impl From<fbk_common::Error> for FetchError {
    fn from(err: fbk_common::Error) -> Self {
        match err {
            fbk_common::Error::TornDown(_) => FetchError::TornDown,
            fbk_common::Error::Internal(msg) => FetchError::Internal(msg),
            other => FetchError::Internal(other.to_string()),
        }
    }
}

/// A pushed message that is not a valid review
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid review event: {reason}")]
pub struct StreamParseError {
    pub reason: String,
    /// Raw `data` payload, kept for logging
    pub payload: String,
}

/// Event stream connection failure; always followed by a reconnect
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamTransportError {
    #[error("Event stream connect failed: {0}")]
    Connect(String),

    #[error("Event stream rejected with HTTP {0}")]
    Status(u16),

    #[error("Event stream read failed: {0}")]
    Body(String),

    #[error("Event stream closed by server")]
    Ended,
}

impl From<ApiError> for StreamTransportError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(msg) => StreamTransportError::Connect(msg),
            ApiError::Status { status, .. } => StreamTransportError::Status(status),
            ApiError::Decode(msg) => StreamTransportError::Body(msg),
        }
    }
}
