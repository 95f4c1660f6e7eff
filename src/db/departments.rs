//! Department queries.

use serde::Deserialize;
use serde_json::json;

use super::{DataLayer, Returning, now_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::{Department, DepartmentRecord};

const LIST_ACTIVE_DEPARTMENTS: &str = r#"
query GetAllDepartments {
  Department(where: { deletedAt: { _is_null: true } }) {
    id name description isPublic createdAt updatedAt
  }
}"#;

const GET_DEPARTMENT: &str = r#"
query GetDepartmentById($id: Int!) {
  Department(where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }) {
    id name description isPublic
  }
}"#;

const FIND_BY_NAME: &str = r#"
query FindDepartmentByName($name: String!) {
  Department(where: { name: { _eq: $name } }, order_by: { deletedAt: asc_nulls_first }) {
    id name deletedAt
  }
}"#;

const CREATE_DEPARTMENT: &str = r#"
mutation CreateDepartment($object: Department_insert_input!) {
  insert_Department_one(object: $object) {
    id name description isPublic createdAt updatedAt
  }
}"#;

const RESTORE_DEPARTMENT: &str = r#"
mutation RestoreDepartment($id: Int!, $description: String, $updatedAt: timestamptz!) {
  update_Department(
    where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: false } }] }
    _set: { deletedAt: null, description: $description, updatedAt: $updatedAt }
  ) {
    affected_rows
    returning { id name description isPublic createdAt updatedAt }
  }
}"#;

const UPDATE_DEPARTMENT: &str = r#"
mutation UpdateDepartment(
  $id: Int!
  $name: String!
  $description: String!
  $isPublic: Boolean!
  $updatedAt: timestamptz!
) {
  update_Department(
    where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }
    _set: { name: $name, description: $description, isPublic: $isPublic, updatedAt: $updatedAt }
  ) {
    affected_rows
    returning { id name description isPublic createdAt updatedAt }
  }
}"#;

const SOFT_DELETE_DEPARTMENTS: &str = r#"
mutation SoftDeleteDepartments($ids: [Int!]!, $deletedAt: timestamptz!) {
  update_Department(
    where: { _and: [{ id: { _in: $ids } }, { deletedAt: { _is_null: true } }] }
    _set: { deletedAt: $deletedAt, updatedAt: $deletedAt }
  ) {
    affected_rows
    returning { id }
  }
}"#;

#[derive(Deserialize)]
struct DepartmentRows<T> {
    #[serde(rename = "Department")]
    department: Vec<T>,
}

#[derive(Deserialize)]
struct Inserted {
    #[serde(rename = "insert_Department_one")]
    department: Option<Department>,
}

#[derive(Deserialize)]
struct Updated<T> {
    #[serde(rename = "update_Department")]
    update: Returning<T>,
}

#[derive(Deserialize)]
struct IdOnly {
    id: i64,
}

/// List every active department.
pub async fn list_active(db: &DataLayer) -> AppResult<Vec<Department>> {
    let rows: DepartmentRows<Department> = db
        .run("GetAllDepartments", LIST_ACTIVE_DEPARTMENTS, json!({}))
        .await?;
    Ok(rows.department)
}

/// Find an active department by id.
pub async fn find_active(db: &DataLayer, id: i64) -> AppResult<Option<Department>> {
    let rows: DepartmentRows<Department> = db
        .run("GetDepartmentById", GET_DEPARTMENT, json!({ "id": id }))
        .await?;
    Ok(rows.department.into_iter().next())
}

/// Find a department by exact name, active or soft-deleted. Active rows sort first.
pub async fn find_by_name(db: &DataLayer, name: &str) -> AppResult<Option<DepartmentRecord>> {
    let rows: DepartmentRows<DepartmentRecord> = db
        .run("FindDepartmentByName", FIND_BY_NAME, json!({ "name": name }))
        .await?;
    Ok(rows.department.into_iter().next())
}

/// Insert a new department.
pub async fn insert(
    db: &DataLayer,
    name: &str,
    description: Option<&str>,
) -> AppResult<Department> {
    let now = now_timestamp();
    let inserted: Inserted = db
        .run(
            "CreateDepartment",
            CREATE_DEPARTMENT,
            json!({
                "object": {
                    "name": name,
                    "description": description,
                    "createdAt": now,
                    "updatedAt": now,
                }
            }),
        )
        .await?;

    inserted
        .department
        .ok_or_else(|| AppError::Internal("Failed to create department".to_string()))
}

/// Clear the soft-delete marker of a department and replace its description.
pub async fn restore(
    db: &DataLayer,
    id: i64,
    description: Option<&str>,
) -> AppResult<Option<Department>> {
    let updated: Updated<Department> = db
        .run(
            "RestoreDepartment",
            RESTORE_DEPARTMENT,
            json!({ "id": id, "description": description, "updatedAt": now_timestamp() }),
        )
        .await?;
    Ok(updated.update.returning.into_iter().next())
}

/// Update an active department. Returns `None` when no active row matched.
pub async fn update(
    db: &DataLayer,
    id: i64,
    name: &str,
    description: &str,
    is_public: bool,
) -> AppResult<Option<Department>> {
    let updated: Updated<Department> = db
        .run(
            "UpdateDepartment",
            UPDATE_DEPARTMENT,
            json!({
                "id": id,
                "name": name,
                "description": description,
                "isPublic": is_public,
                "updatedAt": now_timestamp(),
            }),
        )
        .await?;

    if updated.update.affected_rows == 0 {
        return Ok(None);
    }
    Ok(updated.update.returning.into_iter().next())
}

/// Soft-delete every active department in `ids` with one mutation.
/// Returns the ids that were actually deleted.
pub async fn soft_delete_many(db: &DataLayer, ids: &[i64]) -> AppResult<Vec<i64>> {
    let updated: Updated<IdOnly> = db
        .run(
            "SoftDeleteDepartments",
            SOFT_DELETE_DEPARTMENTS,
            json!({ "ids": ids, "deletedAt": now_timestamp() }),
        )
        .await?;
    Ok(updated.update.returning.into_iter().map(|r| r.id).collect())
}

/// Resolve a department by name, restoring or creating it as needed.
pub async fn find_or_create(db: &DataLayer, name: &str) -> AppResult<i64> {
    match find_by_name(db, name).await? {
        Some(existing) if !existing.is_deleted() => Ok(existing.id),
        Some(deleted) => {
            let restored = restore(db, deleted.id, None).await?;
            Ok(restored.map(|d| d.id).unwrap_or(deleted.id))
        }
        None => Ok(insert(db, name, None).await?.id),
    }
}
