//! Inference error types.

use thiserror::Error;

/// Errors from a chat completion call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body is not a usable completion.
    #[error("invalid completion response: {reason}")]
    ResponseError { reason: String },

    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl InferenceError {
    /// Extract the error body text, if this is an `HttpError`.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            InferenceError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_http_error() {
        let err = InferenceError::HttpError {
            status: 401,
            body: "invalid api key".to_string(),
        };
        assert_eq!(err.error_body(), Some("invalid api key"));
        assert_eq!(err.to_string(), "HTTP 401: invalid api key");
    }

    #[test]
    fn error_body_non_http() {
        let err = InferenceError::Timeout { duration_secs: 60 };
        assert!(err.error_body().is_none());
        assert_eq!(err.to_string(), "inference timeout after 60s");
    }
}
