//! Session and role models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role stored on a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SystemAdmin,
    DeptAdmin,
    User,
}

impl Role {
    /// Parse a stored role. Anything unrecognised is treated as the least privileged role.
    pub fn parse(s: &str) -> Self {
        match s {
            "SYSTEM_ADMIN" => Self::SystemAdmin,
            "DEPT_ADMIN" => Self::DeptAdmin,
            _ => Self::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemAdmin => "SYSTEM_ADMIN",
            Self::DeptAdmin => "DEPT_ADMIN",
            Self::User => "USER",
        }
    }

    /// Whether the role may use the management API.
    pub fn can_manage(&self) -> bool {
        !matches!(self, Self::User)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access token JWT claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

impl SessionClaims {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

/// User fields carried through the session subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub avatar: Option<String>,
}
