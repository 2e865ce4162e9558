//! User identity and role predicates.

use serde::{Deserialize, Serialize};

/// Role id assigned to administrators by the backend.
const ADMIN_ROLE_ID: i64 = 1;

/// Smallest role id the backend assigns to full club members.
const MEMBER_ROLE_ID_FLOOR: i64 = 5;

/// The identity record issued by the auth endpoints.
///
/// Immutable once issued: login and register replace it wholesale, nothing
/// patches individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Backend user id.
    pub user_id: i64,
    /// Login name.
    pub user_name: String,
    /// Display name.
    pub name: String,
    /// Numeric role id; interpreted only through [`RolePredicate`].
    pub role_id: i64,
    /// Avatar reference, when the user has set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Explicit role requirement attached to a route rule.
///
/// Kept as a closed enum rather than a free predicate so the guard's
/// fail-closed branches are exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolePredicate {
    /// Administrators only.
    Admin,
    /// Full club members (and anyone above that tier).
    Member,
}

impl RolePredicate {
    /// Whether `user` satisfies this requirement.
    pub fn allows(&self, user: &UserRecord) -> bool {
        match self {
            RolePredicate::Admin => user.role_id == ADMIN_ROLE_ID,
            RolePredicate::Member => user.role_id >= MEMBER_ROLE_ID_FLOOR,
        }
    }
}

impl std::fmt::Display for RolePredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RolePredicate::Admin => write!(f, "admin"),
            RolePredicate::Member => write!(f, "member"),
        }
    }
}
