//! Auth endpoint payloads.

use serde::{Deserialize, Serialize};

use crate::user::UserRecord;

/// Login endpoint path.
pub const LOGIN_PATH: &str = "/api/auth/v1/login";

/// Registration endpoint path.
pub const REGISTER_PATH: &str = "/api/auth/v1/register";

/// Token refresh endpoint path. The request pipeline never retries a call
/// against this path.
pub const REFRESH_PATH: &str = "/api/auth/v1/refresh";

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// New-account payload posted to the registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Successful login (and register) payload: the issued identity plus its
/// bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub user: UserRecord,
    pub token: String,
}

/// Body posted to the refresh endpoint: the token being renewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// Successful refresh payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshData {
    pub token: String,
}
