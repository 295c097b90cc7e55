//! Error types for the API client
//!
//! Everything a caller sees is a normalized [`AppError`]. [`TransportError`]
//! only lives between the transport and the executor.

use serde_json::Value;
use std::time::Duration;
use storefront_core::error::{NETWORK_ERROR_CODE, NETWORK_ERROR_MESSAGE, TIMEOUT_CODE};
use storefront_core::{AppError, RawFailure};
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, AppError>;

/// Failures raised by a [`Transport`](crate::transport::Transport)
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, parsed as JSON when possible
        body: Value,
    },

    /// No response was received (DNS, refused connection, reset)
    #[error("No response: {message}")]
    NoResponse {
        /// Transport-level code
        code: String,
        /// Human readable reason
        message: String,
    },

    /// The transport ceiling elapsed
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// The body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Shorthand for a no-response failure with the default code
    pub fn no_response(message: impl Into<String>) -> Self {
        Self::NoResponse {
            code: NETWORK_ERROR_CODE.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::NoResponse {
                code: TIMEOUT_CODE.to_string(),
                message: err.to_string(),
            }
        } else if err.is_connect() || err.is_request() {
            Self::no_response(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<TransportError> for RawFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, body } => Self::Response { status, body },
            TransportError::NoResponse { code, message } => Self::NoResponse {
                code: Some(code),
                message: Some(message),
            },
            TransportError::Timeout(elapsed) => Self::App(
                AppError::network(
                    TIMEOUT_CODE,
                    format!("{NETWORK_ERROR_MESSAGE} (timed out after {}s)", elapsed.as_secs()),
                ),
            ),
            TransportError::Decode(message) | TransportError::Other(message) => Self::Text(message),
        }
    }
}
