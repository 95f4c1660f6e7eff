//! User queries.

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::json;

use super::{Affected, DataLayer, Returning, now_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::{ProfileInput, Role, User, UserSummary};

/// Provider recorded for accounts created with an email and password.
pub const PROVIDER_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";

const LIST_ACTIVE_USERS: &str = r#"
query GetAllUsers {
  User(where: { deletedAt: { _is_null: true } }) {
    id name phone provider role createdAt avatar address email gender
  }
}"#;

const GET_USER: &str = r#"
query GetUser($id: Int!) {
  User(where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }) {
    id name email phone gender avatar address dateofbirth githubId googleId
    createdAt provider role updatedAt deletedAt
  }
}"#;

const FIND_ACTIVE_USER_ID: &str = r#"
query FindActiveUserId($id: Int!) {
  User(where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }) {
    id
  }
}"#;

const CHECK_EMAIL: &str = r#"
query CheckEmail($email: String!) {
  User(where: { _and: [{ email: { _eq: $email } }, { deletedAt: { _is_null: true } }] }) {
    id
  }
}"#;

const CREATE_USER: &str = r#"
mutation CreateUser($object: User_insert_input!) {
  insert_User_one(object: $object) {
    id name email phone gender avatar address dateofbirth githubId googleId
    createdAt provider role updatedAt deletedAt
  }
}"#;

const UPDATE_USER_PROFILE: &str = r#"
mutation UpdateUserProfile($id: Int!, $set: User_set_input!) {
  update_User(
    where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }
    _set: $set
  ) {
    affected_rows
    returning {
      id name email phone gender avatar address dateofbirth githubId googleId
      createdAt provider role updatedAt deletedAt
    }
  }
}"#;

const SOFT_DELETE_USER: &str = r#"
mutation SoftDeleteUser($id: Int!, $deletedAt: timestamptz!) {
  update_User(
    where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }
    _set: { deletedAt: $deletedAt, updatedAt: $deletedAt }
  ) {
    affected_rows
  }
}"#;

const REVOKE_USER_ACCESS: &str = r#"
mutation RevokeUserAccess($id: Int!) {
  update_User(
    where: { id: { _eq: $id } }
    _set: {
      refreshToken: null
      refreshTokenExpiresAt: null
      clientRefreshToken: null
      clientRefreshTokenExpiresAt: null
    }
  ) {
    affected_rows
  }
}"#;

const SET_RESET_CODE: &str = r#"
mutation SetPasswordResetCode($id: Int!, $oobCode: String!, $expiresAt: timestamptz!) {
  update_User(
    where: { id: { _eq: $id } }
    _set: { oobCode: $oobCode, oobCodeExpiresAt: $expiresAt }
  ) {
    affected_rows
  }
}"#;

#[derive(Deserialize)]
struct UserRows<T> {
    #[serde(rename = "User")]
    user: Vec<T>,
}

#[derive(Deserialize)]
struct InsertedUser {
    #[serde(rename = "insert_User_one")]
    user: Option<User>,
}

#[derive(Deserialize)]
struct UpdatedUsers<T> {
    #[serde(rename = "update_User")]
    update: T,
}

/// List every active user.
pub async fn list_active(db: &DataLayer) -> AppResult<Vec<UserSummary>> {
    let rows: UserRows<UserSummary> = db
        .run("GetAllUsers", LIST_ACTIVE_USERS, json!({}))
        .await?;
    Ok(rows.user)
}

/// Find an active user by id.
pub async fn find_by_id(db: &DataLayer, id: i64) -> AppResult<Option<User>> {
    let rows: UserRows<User> = db.run("GetUser", GET_USER, json!({ "id": id })).await?;
    Ok(rows.user.into_iter().next())
}

/// Whether an active user with this id exists.
pub async fn exists_active(db: &DataLayer, id: i64) -> AppResult<bool> {
    let rows: UserRows<IgnoredAny> = db
        .run("FindActiveUserId", FIND_ACTIVE_USER_ID, json!({ "id": id }))
        .await?;
    Ok(!rows.user.is_empty())
}

/// Whether an active user already uses this email. Comparison is on the lowercased value.
pub async fn email_in_use(db: &DataLayer, email: &str) -> AppResult<bool> {
    let rows: UserRows<IgnoredAny> = db
        .run(
            "CheckEmail",
            CHECK_EMAIL,
            json!({ "email": email.trim().to_lowercase() }),
        )
        .await?;
    Ok(!rows.user.is_empty())
}

/// Insert a user created by an administrator.
pub async fn create(db: &DataLayer, input: &ProfileInput) -> AppResult<User> {
    let now = now_timestamp();
    let mut object = profile_columns(input);
    object["role"] = json!(Role::User.as_str());
    object["provider"] = json!(PROVIDER_EMAIL_PASSWORD);
    object["createdAt"] = json!(now);
    object["updatedAt"] = json!(now);

    let inserted: InsertedUser = db
        .run("CreateUser", CREATE_USER, json!({ "object": object }))
        .await?;

    inserted
        .user
        .ok_or_else(|| AppError::Internal("Failed to create user".to_string()))
}

/// Update profile fields of an active user. Returns `None` when no active row matched.
pub async fn update_profile(
    db: &DataLayer,
    id: i64,
    input: &ProfileInput,
) -> AppResult<Option<User>> {
    let mut set = profile_columns(input);
    set["updatedAt"] = json!(now_timestamp());

    let updated: UpdatedUsers<Returning<User>> = db
        .run(
            "UpdateUserProfile",
            UPDATE_USER_PROFILE,
            json!({ "id": id, "set": set }),
        )
        .await?;

    if updated.update.affected_rows == 0 {
        return Ok(None);
    }
    Ok(updated.update.returning.into_iter().next())
}

/// Soft-delete one user. Returns the number of rows affected.
pub async fn soft_delete(db: &DataLayer, id: i64) -> AppResult<i64> {
    let updated: UpdatedUsers<Affected> = db
        .run(
            "SoftDeleteUser",
            SOFT_DELETE_USER,
            json!({ "id": id, "deletedAt": now_timestamp() }),
        )
        .await?;
    Ok(updated.update.affected_rows)
}

/// Clear every stored refresh credential for a user.
pub async fn revoke_tokens(db: &DataLayer, id: i64) -> AppResult<i64> {
    let updated: UpdatedUsers<Affected> = db
        .run("RevokeUserAccess", REVOKE_USER_ACCESS, json!({ "id": id }))
        .await?;
    Ok(updated.update.affected_rows)
}

/// Store a hashed password reset code with its expiry.
pub async fn set_reset_code(
    db: &DataLayer,
    id: i64,
    code_hash: &str,
    expires_at: &str,
) -> AppResult<()> {
    let updated: UpdatedUsers<Affected> = db
        .run(
            "SetPasswordResetCode",
            SET_RESET_CODE,
            json!({ "id": id, "oobCode": code_hash, "expiresAt": expires_at }),
        )
        .await?;

    if updated.update.affected_rows == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

fn profile_columns(input: &ProfileInput) -> serde_json::Value {
    json!({
        "name": input.name,
        "email": input.email,
        "phone": input.phone,
        "address": input.address,
        "dateofbirth": input.date_of_birth,
        "avatar": input.avatar,
        "gender": input.gender.map(|g| g.as_str()),
    })
}
