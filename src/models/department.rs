//! Department models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Maximum department name length, in characters.
pub const DEPARTMENT_NAME_MAX_LENGTH: usize = 50;

/// Department every self-registered user joins.
pub const GENERAL_DEPARTMENT_NAME: &str = "General Department";

/// Active department.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Department lookup result including the soft-delete marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRecord {
    pub id: i64,
    pub name: String,
    pub deleted_at: Option<String>,
}

impl DepartmentRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Create request body.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Update request body; every field is required.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// Validate and normalise a department name.
pub fn validate_department_name(raw: Option<&str>) -> Result<String, &'static str> {
    let name = raw.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err("Missing fields");
    }
    if name.chars().count() > DEPARTMENT_NAME_MAX_LENGTH {
        return Err("Department name must be at most 50 characters");
    }
    Ok(name.to_string())
}
