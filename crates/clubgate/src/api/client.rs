//! The request pipeline: bearer attachment, 401 recovery, single retry.

use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::Shared;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use clubgate_protocol::{Envelope, REFRESH_PATH};

use super::transport::{ApiRequest, RawResponse, Transport};
use crate::error::{ApiError, AuthError};
use crate::session::SessionStore;

/// HTTP status that triggers credential recovery.
const UNAUTHORIZED: u16 = 401;

type RefreshFuture =
    Shared<Pin<Box<dyn std::future::Future<Output = Result<String, AuthError>> + Send>>>;

/// Coordination state for the single-flight refresh cycle.
///
/// At most one cycle exists at a time; concurrent 401s join the active
/// cycle's shared future instead of starting another, so the refresh endpoint
/// is called at most once per expiry event.
#[derive(Default)]
struct RefreshSlot {
    /// Monotonic id so a waiter only clears its own finished cycle, never a
    /// newer one that raced in behind it.
    next_cycle: u64,
    active: Option<(u64, RefreshFuture)>,
}

/// Outbound API client.
///
/// Every call issued through it carries the current bearer token (when one
/// exists) and survives exactly one credential expiry when the token can be
/// refreshed. Unauthenticated calls pass through untouched; public endpoints
/// need no session.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    refresh: Mutex<RefreshSlot>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            transport,
            session,
            refresh: Mutex::new(RefreshSlot::default()),
        }
    }

    /// The session store this client reads credentials from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.call(ApiRequest::post(path).json(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        self.call(ApiRequest::put(path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(ApiRequest::delete(path)).await
    }

    /// Issue a call, recovering from at most one credential expiry.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let (token, epoch) = self.session.token().await;
        let mut request = request;
        request.bearer = token;

        let response = self.transport.execute(&request).await?;
        if response.status != UNAUTHORIZED {
            return Self::decode(response);
        }

        // Never refresh on behalf of the refresh endpoint itself; that is
        // how retry loops start.
        if request.path == REFRESH_PATH {
            return Err(AuthError::Expired.into());
        }

        debug!("401 on {} {}, entering refresh cycle", request.method, request.path);
        let fresh = self.recover(epoch).await?;
        request.bearer = Some(fresh);

        // One retry only. A second 401 means the new credential is no good
        // either.
        let response = self.transport.execute(&request).await?;
        if response.status == UNAUTHORIZED {
            warn!("retry after refresh still unauthorized on {}", request.path);
            return Err(AuthError::Expired.into());
        }
        Self::decode(response)
    }

    /// Join or start the single-flight refresh cycle and return the token to
    /// retry with.
    ///
    /// `observed_epoch` is the session epoch the failing request attached its
    /// token under. If the session has moved past it (a concurrent refresh
    /// already completed, or a logout cleared it), no refresh call is made
    /// for the dead credential.
    async fn recover(&self, observed_epoch: u64) -> Result<String, ApiError> {
        let (cycle_id, future) = {
            let mut slot = self.refresh.lock().await;

            let (current_token, current_epoch) = self.session.token().await;
            if current_epoch != observed_epoch {
                // The session changed after this request captured its token.
                return match current_token {
                    Some(token) => Ok(token),
                    None => Err(AuthError::Expired.into()),
                };
            }
            if let Some((id, future)) = &slot.active {
                (*id, future.clone())
            } else {
                let id = slot.next_cycle;
                slot.next_cycle += 1;
                let session = Arc::clone(&self.session);
                let future: RefreshFuture =
                    async move { session.refresh().await }.boxed().shared();
                slot.active = Some((id, future.clone()));
                (id, future)
            }
        };

        let outcome = future.await;

        {
            let mut slot = self.refresh.lock().await;
            if slot.active.as_ref().is_some_and(|(id, _)| *id == cycle_id) {
                slot.active = None;
            }
        }

        // Every waiter joined to the cycle observes the same outcome; a
        // failed cycle expires them all. The failure is not remembered, so
        // a later 401 starts a fresh cycle and a transient refresh outage
        // heals on the next request.
        outcome.map_err(|err| {
            warn!("refresh cycle failed: {err}");
            AuthError::Expired.into()
        })
    }

    /// Decode a non-401 response into the caller's payload.
    fn decode<T: DeserializeOwned>(response: RawResponse) -> Result<T, ApiError> {
        if response.is_success() {
            let envelope: Envelope<T> = serde_json::from_value(response.body)
                .map_err(|err| ApiError::Decode(err.to_string()))?;
            return envelope.into_result().map_err(ApiError::from);
        }

        // Non-2xx with an envelope body keeps the server's code and message;
        // otherwise the HTTP status stands in.
        let code = response.body.get("code").and_then(Value::as_i64);
        let msg = response.body.get("msg").and_then(Value::as_str);
        match (code, msg) {
            (Some(code), Some(msg)) => Err(ApiError::Remote {
                code,
                msg: msg.to_string(),
            }),
            _ => Err(ApiError::Remote {
                code: i64::from(response.status),
                msg: format!("http status {}", response.status),
            }),
        }
    }
}
