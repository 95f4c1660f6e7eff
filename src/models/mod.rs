//! Domain models for the admin server.

use serde::Serialize;
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

pub mod course;
pub mod department;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use course::{Course, CreateCourseRequest, UpdateCourseRequest};
pub use department::{
    CreateDepartmentRequest, Department, DepartmentRecord, UpdateDepartmentRequest,
};
pub use session::{PublicUser, Role, SessionClaims};
pub use user::{Gender, MemberUser, ProfileInput, User, UserSummary};

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Envelope for endpoints that only report an outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Request body carrying a list of ids under `ids`.
#[derive(Debug, Default, serde::Deserialize, ToSchema)]
pub struct IdsRequest {
    #[schema(value_type = Option<Vec<Object>>)]
    pub ids: Option<Vec<JsonValue>>,
}

/// Request body carrying a list of user ids under `userIds`.
#[derive(Debug, Default, serde::Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdsRequest {
    #[schema(value_type = Option<Vec<Object>>)]
    pub user_ids: Option<Vec<JsonValue>>,
}

/// Request body carrying a single `userId`.
#[derive(Debug, Default, serde::Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    #[schema(value_type = Option<Object>)]
    pub user_id: Option<JsonValue>,
}

/// Ids are GraphQL `Int`, so anything past `i32::MAX` cannot name a row.
fn in_id_range(id: i64) -> bool {
    id > 0 && id <= i64::from(i32::MAX)
}

/// Parse a positive integer id from a JSON number or numeric string.
pub fn parse_id(raw: &JsonValue) -> Option<i64> {
    let id = match raw {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    in_id_range(id).then_some(id)
}

/// Parse a positive integer id from a path or query segment.
pub fn parse_id_str(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| in_id_range(*id))
}

/// Keep the valid ids, dropping duplicates while preserving first-seen order.
pub fn unique_ids(raw: &[JsonValue]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    raw.iter()
        .filter_map(parse_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Parse every id, failing if any entry is not a positive integer.
pub fn strict_ids(raw: &[JsonValue]) -> Option<Vec<i64>> {
    raw.iter().map(parse_id).collect()
}

/// Trim a string, mapping blank input to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
