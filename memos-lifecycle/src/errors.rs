//! Error types for the MemOS lifecycle hooks
//!
//! Every failure talking to the memory service ends up as a [`MemosError`].
//! The transport collapses per-attempt failures into [`MemosError::CallFailed`]
//! once its retry budget is spent, so callers only ever have to decide
//! between "data" and "no data".

use thiserror::Error;

/// Main error type for memory service operations
#[derive(Error, Debug)]
pub enum MemosError {
    /// The service answered with a non-2xx status
    #[error("HTTP {status}")]
    HttpStatus {
        /// Status code returned by the service
        status: u16,
    },

    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    /// A single attempt exceeded its deadline
    #[error("Request timed out after {millis}ms")]
    Timeout {
        /// Per-attempt timeout that elapsed
        millis: u64,
    },

    /// The body could not be decoded as JSON
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// All attempts against an endpoint failed
    #[error("Call to {endpoint} failed after {attempts} attempt(s): {last}")]
    CallFailed {
        /// Endpoint path, e.g. `/product/search`
        endpoint: String,
        /// Number of attempts made
        attempts: u32,
        /// Failure observed on the final attempt
        #[source]
        last: Box<MemosError>,
    },
}

/// Result type alias for memory service operations
pub type Result<T> = std::result::Result<T, MemosError>;

impl MemosError {
    /// Create a new CallFailed error
    pub fn call_failed(endpoint: impl Into<String>, attempts: u32, last: MemosError) -> Self {
        Self::CallFailed {
            endpoint: endpoint.into(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpStatus { .. }
            | Self::Network(_)
            | Self::Timeout { .. }
            | Self::InvalidResponse(_) => true,
            Self::CallFailed { last, .. } => last.is_transient(),
            Self::Config(_) | Self::Json(_) => false,
        }
    }
}

impl From<reqwest::Error> for MemosError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout { millis: 0 };
        }
        if let Some(status) = e.status() {
            return Self::HttpStatus {
                status: status.as_u16(),
            };
        }
        if e.is_decode() {
            return Self::InvalidResponse(e.to_string());
        }
        Self::Network(e.to_string())
    }
}
