//! Error taxonomy for the client core.

use thiserror::Error;

use clubgate_protocol::EnvelopeError;

/// Credential failures.
///
/// `Clone` because every waiter joined to a single refresh cycle receives the
/// same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The credential is invalid or expired and could not be recovered for
    /// this request.
    #[error("session expired")]
    Expired,

    /// Explicit server-side rejection (login, register, refresh) with the
    /// server's human-readable reason.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Failures surfaced by the request pipeline.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No response: unreachable host, connection reset, DNS failure.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured upper bound.
    #[error("request timed out")]
    Timeout,

    /// Credential failure, unrecoverable for this request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Transport succeeded but the application code was non-zero. Always
    /// propagated unchanged.
    #[error("remote error {code}: {msg}")]
    Remote { code: i64, msg: String },

    /// The response body did not match the expected envelope shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Remote { code, msg } => ApiError::Remote { code, msg },
            EnvelopeError::MissingData => ApiError::Decode(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Durable-storage failures. Boot-time loads fail open to an anonymous
/// session; mutation-time failures are surfaced.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem failure.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored snapshot could not be parsed.
    #[error("corrupt session snapshot: {0}")]
    Corrupt(String),
}
