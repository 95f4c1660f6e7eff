//! User models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Full user profile as returned by `get-user`, `create` and `update-profile`.
///
/// The backing column is spelled `dateofbirth`; it is exposed as `dateOfBirth`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    /// `"1"`, `"2"` or null
    pub gender: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    #[serde(
        default,
        rename(serialize = "dateOfBirth", deserialize = "dateofbirth")
    )]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub github_id: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    pub created_at: Option<String>,
    pub provider: Option<String>,
    pub role: String,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

/// Row returned by the user list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub provider: Option<String>,
    pub role: String,
    pub created_at: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub email: String,
    pub gender: Option<String>,
}

/// Compact user shape used by department membership views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemberUser {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
}

/// Accepted gender codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Validate a gender input. Blank or missing input means "unset".
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, InvalidGender> {
        match raw {
            None | Some("") => Ok(None),
            Some("1") => Ok(Some(Self::Male)),
            Some("2") => Ok(Some(Self::Female)),
            Some(_) => Err(InvalidGender),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "1",
            Self::Female => "2",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid gender value. Must be \"1\", \"2\", or null")]
pub struct InvalidGender;

/// Validated profile fields ready to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileInput {
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<Gender>,
    pub avatar: Option<String>,
}
