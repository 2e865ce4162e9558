//! Remote auth endpoints behind a trait seam.

use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use serde_json::Value;

use clubgate_protocol::{
    Envelope, LOGIN_PATH, LoginData, LoginRequest, REFRESH_PATH, REGISTER_PATH, RefreshData,
    RefreshRequest, RegisterRequest,
};

use crate::api::{ApiRequest, RawResponse, Transport};
use crate::error::AuthError;

/// The three remote auth operations the session store depends on.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for an identity and a bearer token.
    async fn login(&self, request: &LoginRequest) -> Result<LoginData, AuthError>;

    /// Create an account; success also establishes a session.
    async fn register(&self, request: &RegisterRequest) -> Result<LoginData, AuthError>;

    /// Exchange the current token for a fresh one.
    async fn refresh(&self, token: &str) -> Result<String, AuthError>;
}

/// Auth backend speaking the `{code, msg, data}` envelope over HTTP.
pub struct HttpAuthBackend {
    transport: Arc<dyn Transport>,
}

impl HttpAuthBackend {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Decode a credential-issuing response (login, register).
    fn decode_login(response: RawResponse) -> Result<LoginData, AuthError> {
        if !response.is_success() {
            return Err(Self::rejection(response));
        }
        let envelope: Envelope<LoginData> = serde_json::from_value(response.body)
            .map_err(|err| AuthError::Rejected(format!("malformed response: {err}")))?;
        envelope
            .into_result()
            .map_err(|err| AuthError::Rejected(err.to_string()))
    }

    /// Turn a non-2xx auth response into the server's reason when one is
    /// present.
    fn rejection(response: RawResponse) -> AuthError {
        let msg = response
            .body
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if msg.is_empty() {
            AuthError::Rejected(format!("auth endpoint returned status {}", response.status))
        } else {
            AuthError::Rejected(msg)
        }
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, request: &LoginRequest) -> Result<LoginData, AuthError> {
        let body = serde_json::to_value(request)
            .map_err(|err| AuthError::Rejected(err.to_string()))?;
        let response = self
            .transport
            .execute(&ApiRequest::post(LOGIN_PATH).json(body))
            .await
            .map_err(|err| AuthError::Rejected(err.to_string()))?;
        Self::decode_login(response)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<LoginData, AuthError> {
        let body = serde_json::to_value(request)
            .map_err(|err| AuthError::Rejected(err.to_string()))?;
        let response = self
            .transport
            .execute(&ApiRequest::post(REGISTER_PATH).json(body))
            .await
            .map_err(|err| AuthError::Rejected(err.to_string()))?;
        Self::decode_login(response)
    }

    async fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let body = serde_json::to_value(RefreshRequest {
            token: token.to_string(),
        })
        .map_err(|_| AuthError::Expired)?;

        let response = self
            .transport
            .execute(&ApiRequest::post(REFRESH_PATH).json(body))
            .await
            .map_err(|err| {
                warn!("token refresh transport failure: {err}");
                AuthError::Expired
            })?;

        if !response.is_success() {
            // A refresh the server refuses means the credential is gone.
            return Err(AuthError::Expired);
        }

        let envelope: Envelope<RefreshData> =
            serde_json::from_value(response.body).map_err(|_| AuthError::Expired)?;
        match envelope.into_result() {
            Ok(data) => Ok(data.token),
            Err(err) => {
                warn!("token refresh rejected: {err}");
                Err(AuthError::Expired)
            }
        }
    }
}
