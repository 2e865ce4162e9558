//! Wire types shared between the clubgate client core and its consumers.
//!
//! Every remote endpoint in this system answers with the same envelope shape:
//!
//! ```text
//! { "code": 0, "msg": "ok", "traceid": "...", "data": { ... } }
//! ```
//!
//! `code == 0` signals success; a non-zero code is an application-level
//! rejection whose human-readable reason rides in `msg`. This crate defines
//! that envelope, the auth request/response payloads, and the user record
//! with its role predicates. The business payloads of non-auth endpoints are
//! deliberately not modeled here; consumers decode them into their own types.

pub mod auth;
pub mod envelope;
pub mod user;

pub use auth::{
    LOGIN_PATH, LoginData, LoginRequest, REFRESH_PATH, REGISTER_PATH, RefreshData, RefreshRequest,
    RegisterRequest,
};
pub use envelope::{Envelope, EnvelopeError};
pub use user::{RolePredicate, UserRecord};
