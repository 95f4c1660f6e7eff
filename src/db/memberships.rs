//! User/department membership queries over the `_UserDepartments` join table
//! (`A` = user id, `B` = department id).

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::json;

use super::{Affected, DataLayer};
use crate::error::AppResult;
use crate::models::MemberUser;

const MEMBER_IDS: &str = r#"
query GetUserIdsInDepartment($departmentId: Int!) {
  _UserDepartments(where: { B: { _eq: $departmentId } }) {
    A
  }
}"#;

const USERS_BY_IDS: &str = r#"
query GetUsersByIds($userIds: [Int!]!) {
  User(where: { _and: [{ id: { _in: $userIds } }, { deletedAt: { _is_null: true } }] }) {
    id email name role
  }
}"#;

const ACTIVE_MEMBER_CANDIDATES: &str = r#"
query GetAllActiveUsers {
  User(where: { deletedAt: { _is_null: true } }) {
    id email name role
  }
}"#;

const EXISTING_MEMBERS: &str = r#"
query CheckExistingMembers($departmentId: Int!, $userIds: [Int!]!) {
  _UserDepartments(
    where: { _and: [{ B: { _eq: $departmentId } }, { A: { _in: $userIds } }] }
  ) {
    A
  }
}"#;

const ADD_MEMBERS: &str = r#"
mutation AddUsersToDepartment($objects: [_UserDepartments_insert_input!]!) {
  insert__UserDepartments(objects: $objects) {
    affected_rows
  }
}"#;

const REMOVE_MEMBER: &str = r#"
mutation RemoveUserFromDepartment($departmentId: Int!, $userId: Int!) {
  delete__UserDepartments(
    where: { _and: [{ B: { _eq: $departmentId } }, { A: { _eq: $userId } }] }
  ) {
    affected_rows
  }
}"#;

#[derive(Deserialize)]
struct MemberRows {
    #[serde(rename = "_UserDepartments")]
    rows: Vec<MemberRow>,
}

#[derive(Deserialize)]
struct MemberRow {
    #[serde(rename = "A")]
    user_id: i64,
}

#[derive(Deserialize)]
struct UserRows {
    #[serde(rename = "User")]
    user: Vec<MemberUser>,
}

#[derive(Deserialize)]
struct Inserted {
    #[serde(rename = "insert__UserDepartments")]
    insert: Affected,
}

#[derive(Deserialize)]
struct Deleted {
    #[serde(rename = "delete__UserDepartments")]
    delete: Affected,
}

/// Ids of every user linked to a department, active or not.
pub async fn member_ids(db: &DataLayer, department_id: i64) -> AppResult<HashSet<i64>> {
    let rows: MemberRows = db
        .run(
            "GetUserIdsInDepartment",
            MEMBER_IDS,
            json!({ "departmentId": department_id }),
        )
        .await?;
    Ok(rows.rows.into_iter().map(|r| r.user_id).collect())
}

/// Active users belonging to a department.
pub async fn active_members(db: &DataLayer, department_id: i64) -> AppResult<Vec<MemberUser>> {
    let mut ids: Vec<i64> = member_ids(db, department_id).await?.into_iter().collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ids.sort_unstable();

    let rows: UserRows = db
        .run("GetUsersByIds", USERS_BY_IDS, json!({ "userIds": ids }))
        .await?;
    Ok(rows.user)
}

/// Active users that do not belong to a department. Both lookups run concurrently.
pub async fn active_non_members(
    db: &DataLayer,
    department_id: i64,
) -> AppResult<Vec<MemberUser>> {
    let all_users = async {
        db.run::<UserRows>("GetAllActiveUsers", ACTIVE_MEMBER_CANDIDATES, json!({}))
            .await
    };
    let (all, members) =
        futures_util::future::try_join(all_users, member_ids(db, department_id)).await?;

    Ok(all
        .user
        .into_iter()
        .filter(|u| !members.contains(&u.id))
        .collect())
}

/// Which of `user_ids` already belong to the department.
pub async fn existing_members(
    db: &DataLayer,
    department_id: i64,
    user_ids: &[i64],
) -> AppResult<HashSet<i64>> {
    let rows: MemberRows = db
        .run(
            "CheckExistingMembers",
            EXISTING_MEMBERS,
            json!({ "departmentId": department_id, "userIds": user_ids }),
        )
        .await?;
    Ok(rows.rows.into_iter().map(|r| r.user_id).collect())
}

/// Link users to a department. Returns the number of rows inserted.
pub async fn add(db: &DataLayer, department_id: i64, user_ids: &[i64]) -> AppResult<i64> {
    let objects: Vec<_> = user_ids
        .iter()
        .map(|user_id| json!({ "A": user_id, "B": department_id }))
        .collect();

    let inserted: Inserted = db
        .run(
            "AddUsersToDepartment",
            ADD_MEMBERS,
            json!({ "objects": objects }),
        )
        .await?;
    Ok(inserted.insert.affected_rows)
}

/// Unlink one user from a department. Returns the number of rows deleted.
pub async fn remove(db: &DataLayer, department_id: i64, user_id: i64) -> AppResult<i64> {
    let deleted: Deleted = db
        .run(
            "RemoveUserFromDepartment",
            REMOVE_MEMBER,
            json!({ "departmentId": department_id, "userId": user_id }),
        )
        .await?;
    Ok(deleted.delete.affected_rows)
}
