//! Outbound calls to the remote API.

mod client;
mod transport;

pub use client::ApiClient;
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport};
