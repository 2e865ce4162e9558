//! Clubgate Client Core
//!
//! The authenticated request pipeline, session store, and navigation guard
//! behind the club's web front end. Views trigger route transitions; the
//! [`guard::NavigationGuard`] decides whether the transition may proceed,
//! and permitted views issue their calls through [`api::ApiClient`], which
//! attaches the current bearer token and survives a single credential expiry
//! via a coordinated refresh.

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod routes;
pub mod session;

pub use clubgate_protocol as protocol;
