//! The `{code, msg, data}` response envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level failure carried inside a transport-successful response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Non-zero application code with the server's message.
    #[error("remote error {code}: {msg}")]
    Remote { code: i64, msg: String },

    /// `code == 0` but the `data` field was absent.
    #[error("envelope reported success but carried no data")]
    MissingData,
}

/// Uniform response envelope returned by every remote endpoint.
///
/// `data` is deserialized lazily into the caller's payload type; endpoints
/// whose payload is irrelevant can use `Envelope<serde_json::Value>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Application status code; zero is success.
    pub code: i64,
    /// Human-readable status message.
    #[serde(default)]
    pub msg: String,
    /// Server-side trace identifier, when the backend attaches one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceid: Option<String>,
    /// Payload; present on success, usually absent on rejection.
    ///
    /// No `serde(default)` here: serde already maps a missing field to
    /// `None`, and a field-level default would force `T: Default` onto the
    /// derived `Deserialize` impl.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// True iff the application code signals success.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Convert the envelope into its payload.
    ///
    /// A non-zero code is surfaced unchanged as [`EnvelopeError::Remote`];
    /// the core never converts an application failure into a default value.
    pub fn into_result(self) -> Result<T, EnvelopeError> {
        if self.code != 0 {
            return Err(EnvelopeError::Remote {
                code: self.code,
                msg: self.msg,
            });
        }
        self.data.ok_or(EnvelopeError::MissingData)
    }
}
