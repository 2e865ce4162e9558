//! Transport seam: one outbound HTTP call, no retry policy.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use serde_json::Value;

use crate::error::ApiError;

/// An outbound call, fully described before it is issued.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/api/blog/v1/blog/detail`.
    pub path: String,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
    /// JSON body, when the call carries one.
    pub body: Option<Value>,
    /// Bearer token to attach. `None` means an unauthenticated call, which
    /// is allowed for public endpoints.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Transport-level response: status plus decoded JSON body. Any status the
/// server answered with is a transport success; retry policy lives above.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam between the request pipeline and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError>;
}

/// reqwest-backed transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Build the transport. The timeout applies to every call issued through
    /// it; a call exceeding it surfaces as [`ApiError::Timeout`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("-> {} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref token) = request.bearer {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        // Error pages are not always JSON; the pipeline only needs the
        // status to act on those.
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        debug!("<- {status} {url}");
        Ok(RawResponse { status, body })
    }
}
