//! Course queries. The `course` table uses snake_case columns.

use serde::Deserialize;
use serde_json::json;

use super::{DataLayer, Returning, RowId, now_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::Course;

const LIST_ALL_COURSES: &str = r#"
query GetAllCourses {
  course(where: { deleted_at: { _is_null: true } }) {
    id name description created_at updated_at
  }
}"#;

const LIST_COURSES_FOR_CREATOR: &str = r#"
query GetCoursesForDeptAdmin($userId: Int!) {
  course(
    where: { _and: [{ deleted_at: { _is_null: true } }, { created_by: { _eq: $userId } }] }
  ) {
    id name description created_at updated_at
  }
}"#;

const GET_COURSE: &str = r#"
query GetCourseById($id: Int!) {
  course(where: { _and: [{ id: { _eq: $id } }, { deleted_at: { _is_null: true } }] }) {
    id name description created_at updated_at
  }
}"#;

const CREATE_COURSE: &str = r#"
mutation CreateCourse($object: course_insert_input!) {
  insert_course_one(object: $object) {
    id name description created_at updated_at created_by
  }
}"#;

const UPDATE_COURSE: &str = r#"
mutation UpdateCourse($id: Int!, $name: String!, $description: String, $updatedAt: timestamptz!) {
  update_course(
    where: { _and: [{ id: { _eq: $id } }, { deleted_at: { _is_null: true } }] }
    _set: { name: $name, description: $description, updated_at: $updatedAt }
  ) {
    affected_rows
    returning { id name description created_at updated_at created_by }
  }
}"#;

const SOFT_DELETE_COURSE: &str = r#"
mutation SoftDeleteCourse($id: Int!, $deletedAt: timestamptz!) {
  update_course(
    where: { _and: [{ id: { _eq: $id } }, { deleted_at: { _is_null: true } }] }
    _set: { deleted_at: $deletedAt, updated_at: $deletedAt }
  ) {
    affected_rows
    returning { id }
  }
}"#;

#[derive(Deserialize)]
struct CourseRows {
    course: Vec<Course>,
}

#[derive(Deserialize)]
struct Inserted {
    insert_course_one: Option<Course>,
}

#[derive(Deserialize)]
struct Updated<T = Course> {
    update_course: Returning<T>,
}

/// List active courses. When `created_by` is set only that user's courses are returned.
pub async fn list_active(
    db: &DataLayer,
    created_by: Option<i64>,
    role: Option<&str>,
) -> AppResult<Vec<Course>> {
    let rows: CourseRows = match created_by {
        Some(user_id) => {
            db.run_as(
                "GetCoursesForDeptAdmin",
                LIST_COURSES_FOR_CREATOR,
                json!({ "userId": user_id }),
                role,
            )
            .await?
        }
        None => {
            db.run_as("GetAllCourses", LIST_ALL_COURSES, json!({}), role)
                .await?
        }
    };
    Ok(rows.course)
}

/// Find an active course by id.
pub async fn find_active(db: &DataLayer, id: i64) -> AppResult<Option<Course>> {
    let rows: CourseRows = db
        .run("GetCourseById", GET_COURSE, json!({ "id": id }))
        .await?;
    Ok(rows.course.into_iter().next())
}

/// Insert a course, linking it to `department_ids` in the same mutation.
pub async fn insert(
    db: &DataLayer,
    name: &str,
    description: Option<&str>,
    created_by: i64,
    department_ids: &[i64],
) -> AppResult<Course> {
    let mut object = json!({
        "name": name,
        "description": description,
        "created_by": created_by,
    });

    if !department_ids.is_empty() {
        let links: Vec<_> = department_ids
            .iter()
            .map(|id| json!({ "department_id": id }))
            .collect();
        object["CourseDepartments"] = json!({ "data": links });
    }

    let inserted: Inserted = db
        .run("CreateCourse", CREATE_COURSE, json!({ "object": object }))
        .await?;

    inserted
        .insert_course_one
        .ok_or_else(|| AppError::Internal("Failed to create course".to_string()))
}

/// Update an active course. Returns `None` when no active row matched.
pub async fn update(
    db: &DataLayer,
    id: i64,
    name: &str,
    description: Option<&str>,
    role: Option<&str>,
) -> AppResult<Option<Course>> {
    let updated: Updated = db
        .run_as(
            "UpdateCourse",
            UPDATE_COURSE,
            json!({
                "id": id,
                "name": name,
                "description": description,
                "updatedAt": now_timestamp(),
            }),
            role,
        )
        .await?;

    if updated.update_course.affected_rows == 0 {
        return Ok(None);
    }
    Ok(updated.update_course.returning.into_iter().next())
}

/// Soft-delete one course. Returns the ids of the rows that were deleted.
pub async fn soft_delete(db: &DataLayer, id: i64) -> AppResult<Vec<i64>> {
    let updated: Updated<RowId> = db
        .run(
            "SoftDeleteCourse",
            SOFT_DELETE_COURSE,
            json!({ "id": id, "deletedAt": now_timestamp() }),
        )
        .await?;
    Ok(updated
        .update_course
        .returning
        .into_iter()
        .map(|row| row.id)
        .collect())
}
