//! Credential and refresh-token queries on the user row.
//!
//! Refresh tokens and password reset codes are stored as SHA-256 hex digests; the raw
//! values only ever exist in cookies and reset links.

use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{Affected, DataLayer, now_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::PublicUser;

/// Hash a token for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a random refresh token string.
pub fn generate_refresh_token() -> String {
    let random_bytes: [u8; 48] = rand::random();
    hex::encode(random_bytes)
}

/// Generate a random password reset code.
pub fn generate_reset_code() -> String {
    let random_bytes: [u8; 32] = rand::random();
    hex::encode(random_bytes)
}

const FIND_LOGIN_USER: &str = r#"
query FindLoginUser($email: String!) {
  User(where: { _and: [{ email: { _eq: $email } }, { deletedAt: { _is_null: true } }] }) {
    id email name role avatar password
  }
}"#;

const FIND_SESSION_USER: &str = r#"
query FindSessionUser($id: Int!) {
  User(where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }) {
    id email name role avatar
  }
}"#;

const FIND_USER_PASSWORD: &str = r#"
query FindUserPassword($id: Int!) {
  User(where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }) {
    id email name role avatar password
  }
}"#;

const FIND_BY_REFRESH_TOKEN: &str = r#"
query FindUserByRefreshToken($tokenHash: String!, $now: timestamptz!) {
  User(
    where: {
      _and: [
        { refreshToken: { _eq: $tokenHash } }
        { refreshTokenExpiresAt: { _gt: $now } }
        { deletedAt: { _is_null: true } }
      ]
    }
  ) {
    id email name role avatar
  }
}"#;

const STORE_REFRESH_TOKEN: &str = r#"
mutation StoreRefreshToken($id: Int!, $tokenHash: String!, $expiresAt: timestamptz!) {
  update_User(
    where: { id: { _eq: $id } }
    _set: { refreshToken: $tokenHash, refreshTokenExpiresAt: $expiresAt }
  ) {
    affected_rows
  }
}"#;

const ROTATE_REFRESH_TOKEN: &str = r#"
mutation RotateRefreshToken(
  $id: Int!
  $oldHash: String!
  $newHash: String!
  $expiresAt: timestamptz!
) {
  update_User(
    where: {
      _and: [
        { id: { _eq: $id } }
        { refreshToken: { _eq: $oldHash } }
        { deletedAt: { _is_null: true } }
      ]
    }
    _set: { refreshToken: $newHash, refreshTokenExpiresAt: $expiresAt }
  ) {
    affected_rows
  }
}"#;

const CLEAR_REFRESH_TOKEN: &str = r#"
mutation ClearRefreshToken($tokenHash: String!) {
  update_User(
    where: { refreshToken: { _eq: $tokenHash } }
    _set: { refreshToken: null, refreshTokenExpiresAt: null }
  ) {
    affected_rows
  }
}"#;

const UPDATE_PASSWORD: &str = r#"
mutation UpdateUserPassword($id: Int!, $password: String!, $updatedAt: timestamptz!) {
  update_User(
    where: { _and: [{ id: { _eq: $id } }, { deletedAt: { _is_null: true } }] }
    _set: { password: $password, updatedAt: $updatedAt }
  ) {
    affected_rows
  }
}"#;

const FIND_BY_RESET_CODE: &str = r#"
query FindUserByResetCode($codeHash: String!, $now: timestamptz!) {
  User(
    where: {
      _and: [
        { oobCode: { _eq: $codeHash } }
        { oobCodeExpiresAt: { _gt: $now } }
        { deletedAt: { _is_null: true } }
      ]
    }
  ) {
    id email name role avatar
  }
}"#;

const COMPLETE_PASSWORD_RESET: &str = r#"
mutation CompletePasswordReset(
  $id: Int!
  $codeHash: String!
  $password: String!
  $updatedAt: timestamptz!
) {
  update_User(
    where: { _and: [{ id: { _eq: $id } }, { oobCode: { _eq: $codeHash } }] }
    _set: {
      password: $password
      oobCode: null
      oobCodeExpiresAt: null
      refreshToken: null
      refreshTokenExpiresAt: null
      clientRefreshToken: null
      clientRefreshTokenExpiresAt: null
      updatedAt: $updatedAt
    }
  ) {
    affected_rows
  }
}"#;

const INSERT_CREDENTIAL_USER: &str = r#"
mutation InsertCredentialUser($object: User_insert_input!) {
  insert_User_one(object: $object) {
    id email name role avatar
  }
}"#;

/// User row with its password hash.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialRow {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub password: Option<String>,
}

impl CredentialRow {
    pub fn into_public(self) -> (PublicUser, Option<String>) {
        (
            PublicUser {
                id: self.id,
                email: self.email,
                name: self.name,
                role: self.role,
                avatar: self.avatar,
            },
            self.password,
        )
    }
}

/// Fields for a user created with a password.
#[derive(Debug, Clone)]
pub struct NewCredentialUser<'a> {
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub provider: &'a str,
}

#[derive(Deserialize)]
struct UserRows<T> {
    #[serde(rename = "User")]
    user: Vec<T>,
}

#[derive(Deserialize)]
struct Updated {
    #[serde(rename = "update_User")]
    update: Affected,
}

#[derive(Deserialize)]
struct Inserted {
    #[serde(rename = "insert_User_one")]
    user: Option<PublicUser>,
}

/// Find an active user by (already normalised) email, including the password hash.
pub async fn find_login_user(db: &DataLayer, email: &str) -> AppResult<Option<CredentialRow>> {
    let rows: UserRows<CredentialRow> = db
        .run("FindLoginUser", FIND_LOGIN_USER, json!({ "email": email }))
        .await?;
    Ok(rows.user.into_iter().next())
}

/// Find an active user by id, including the password hash.
pub async fn find_credentials(db: &DataLayer, id: i64) -> AppResult<Option<CredentialRow>> {
    let rows: UserRows<CredentialRow> = db
        .run("FindUserPassword", FIND_USER_PASSWORD, json!({ "id": id }))
        .await?;
    Ok(rows.user.into_iter().next())
}

/// Find an active user by id.
pub async fn find_session_user(db: &DataLayer, id: i64) -> AppResult<Option<PublicUser>> {
    let rows: UserRows<PublicUser> = db
        .run("FindSessionUser", FIND_SESSION_USER, json!({ "id": id }))
        .await?;
    Ok(rows.user.into_iter().next())
}

/// Find the active user holding an unexpired refresh token with this hash.
pub async fn find_by_refresh_hash(
    db: &DataLayer,
    token_hash: &str,
) -> AppResult<Option<PublicUser>> {
    let rows: UserRows<PublicUser> = db
        .run(
            "FindUserByRefreshToken",
            FIND_BY_REFRESH_TOKEN,
            json!({ "tokenHash": token_hash, "now": now_timestamp() }),
        )
        .await?;
    Ok(rows.user.into_iter().next())
}

/// Store a refresh token hash unconditionally (login).
pub async fn store_refresh_hash(
    db: &DataLayer,
    user_id: i64,
    token_hash: &str,
    expires_at: &str,
) -> AppResult<()> {
    let updated: Updated = db
        .run(
            "StoreRefreshToken",
            STORE_REFRESH_TOKEN,
            json!({ "id": user_id, "tokenHash": token_hash, "expiresAt": expires_at }),
        )
        .await?;

    if updated.update.affected_rows == 0 {
        return Err(AppError::Internal(
            "Failed to store refresh token".to_string(),
        ));
    }
    Ok(())
}

/// Replace the refresh token hash only if the stored one still equals `old_hash`.
///
/// Returns `false` when another request already rotated the token.
pub async fn rotate_refresh_hash(
    db: &DataLayer,
    user_id: i64,
    old_hash: &str,
    new_hash: &str,
    expires_at: &str,
) -> AppResult<bool> {
    let updated: Updated = db
        .run(
            "RotateRefreshToken",
            ROTATE_REFRESH_TOKEN,
            json!({
                "id": user_id,
                "oldHash": old_hash,
                "newHash": new_hash,
                "expiresAt": expires_at,
            }),
        )
        .await?;
    Ok(updated.update.affected_rows > 0)
}

/// Clear the refresh token matching this hash, wherever it is stored.
pub async fn clear_refresh_hash(db: &DataLayer, token_hash: &str) -> AppResult<i64> {
    let updated: Updated = db
        .run(
            "ClearRefreshToken",
            CLEAR_REFRESH_TOKEN,
            json!({ "tokenHash": token_hash }),
        )
        .await?;
    Ok(updated.update.affected_rows)
}

/// Replace the password hash of an active user.
pub async fn update_password(db: &DataLayer, user_id: i64, password_hash: &str) -> AppResult<()> {
    let updated: Updated = db
        .run(
            "UpdateUserPassword",
            UPDATE_PASSWORD,
            json!({ "id": user_id, "password": password_hash, "updatedAt": now_timestamp() }),
        )
        .await?;

    if updated.update.affected_rows == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// Find the active user holding an unexpired reset code with this hash.
pub async fn find_by_reset_hash(db: &DataLayer, code_hash: &str) -> AppResult<Option<PublicUser>> {
    let rows: UserRows<PublicUser> = db
        .run(
            "FindUserByResetCode",
            FIND_BY_RESET_CODE,
            json!({ "codeHash": code_hash, "now": now_timestamp() }),
        )
        .await?;
    Ok(rows.user.into_iter().next())
}

/// Set a new password, consuming the reset code and every refresh token.
///
/// Returns `false` when the code was consumed concurrently.
pub async fn complete_password_reset(
    db: &DataLayer,
    user_id: i64,
    code_hash: &str,
    password_hash: &str,
) -> AppResult<bool> {
    let updated: Updated = db
        .run(
            "CompletePasswordReset",
            COMPLETE_PASSWORD_RESET,
            json!({
                "id": user_id,
                "codeHash": code_hash,
                "password": password_hash,
                "updatedAt": now_timestamp(),
            }),
        )
        .await?;
    Ok(updated.update.affected_rows > 0)
}

/// Insert a user that signs in with a password.
pub async fn insert_credential_user(
    db: &DataLayer,
    user: &NewCredentialUser<'_>,
) -> AppResult<PublicUser> {
    let now = now_timestamp();
    let inserted: Inserted = db
        .run(
            "InsertCredentialUser",
            INSERT_CREDENTIAL_USER,
            json!({
                "object": {
                    "email": user.email,
                    "name": user.name,
                    "password": user.password_hash,
                    "role": user.role,
                    "provider": user.provider,
                    "createdAt": now,
                    "updatedAt": now,
                }
            }),
        )
        .await?;

    inserted
        .user
        .ok_or_else(|| AppError::Internal("Failed to create user".to_string()))
}
