//! Error types for calls against the attendance backend.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the attendance backend.
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// Connection failed or the request could not be sent
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// Server answered with a non-success status code
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered 2xx but the envelope reported `success = false`
    #[error("Backend rejected request: {message}")]
    Envelope { message: String },

    /// The response body could not be decoded
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    Url { message: String },

    /// The write was superseded by a newer edit before it was sent
    #[error("Request superseded by a newer edit")]
    Superseded,
}

impl ApiError {
    /// Builds a status error from a raw status code.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Status {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Returns true if this error is potentially transient.
    ///
    /// Nothing in the crate retries on its own; this is for callers that
    /// want to offer a manual "try again".
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network { .. } | ApiError::Timeout { .. } => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the backend refused the request as malformed or forbidden.
    pub fn is_client_error(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => (400..500).contains(status),
            ApiError::Envelope { .. } => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            ApiError::status(status, err.to_string())
        } else {
            ApiError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::Url {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ApiError::Network {
            message: "reset".into()
        }
        .is_retryable());
        assert!(ApiError::status(StatusCode::BAD_GATEWAY, "down").is_retryable());
        assert!(!ApiError::status(StatusCode::BAD_REQUEST, "bad").is_retryable());
        assert!(!ApiError::Superseded.is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ApiError::status(StatusCode::CONFLICT, "in use").is_client_error());
        assert!(ApiError::Envelope {
            message: "Day and period are required".into()
        }
        .is_client_error());
        assert!(!ApiError::Timeout {
            message: "90s".into()
        }
        .is_client_error());
    }
}
