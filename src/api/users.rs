//! User management endpoints.

use actix_web::{HttpResponse, get, post, web};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use super::ok;
use crate::auth::ManagerAuth;
use crate::config::Config;
use crate::db::{DataLayer, users};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{
    ApiResponse, Gender, MessageResponse, ProfileInput, User, UserIdRequest, UserIdsRequest,
    UserSummary, non_blank, parse_id, parse_id_str, strict_ids,
};
use crate::services::session::{self, normalize_email};

/// `?id=` query parameter.
#[derive(Debug, Deserialize, IntoParams)]
pub struct UserIdQuery {
    /// User id
    pub id: Option<String>,
}

/// Profile fields accepted by `create` and `update-profile`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    /// `"1"`, `"2"`, empty or null
    pub gender: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileRequest {
    /// Validate the body into writable profile fields.
    fn into_input(self) -> AppResult<ProfileInput> {
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::InvalidInput("Email is required".to_string()))?;

        let gender = Gender::parse(self.gender.as_deref())
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        Ok(ProfileInput {
            name: non_blank(self.name.as_deref()),
            email,
            phone: non_blank(self.phone.as_deref()),
            address: non_blank(self.address.as_deref()),
            date_of_birth: non_blank(self.date_of_birth.as_deref()),
            gender,
            avatar: non_blank(self.avatar.as_deref()),
        })
    }
}

/// Bulk delete result.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteUsersResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: i64,
    pub deleted_ids: Vec<i64>,
}

/// Reset link result.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetLinkResponse {
    pub success: bool,
    pub reset_link: String,
    pub message: String,
}

/// Configure user routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(list_users)
            .service(get_user)
            .service(create_user)
            .service(update_profile)
            .service(bulk_delete_users)
            .service(reset_password)
            .service(revoke_access),
    );
}

fn query_user_id(query: &UserIdQuery, invalid_message: &str) -> AppResult<i64> {
    let raw = query
        .id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing id parameter".to_string()))?;
    parse_id_str(raw).ok_or_else(|| AppError::InvalidInput(invalid_message.to_string()))
}

fn body_user_id(body: &UserIdRequest) -> AppResult<i64> {
    let raw = body
        .user_id
        .as_ref()
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::InvalidInput("User ID is required".to_string()))?;
    parse_id(raw).ok_or_else(|| AppError::InvalidInput("Invalid user ID".to_string()))
}

/// List every active user.
#[utoipa::path(
    get,
    path = "/api/users/get-all",
    tag = "Users",
    responses(
        (status = 200, description = "Active users", body = Vec<UserSummary>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[get("/get-all")]
pub async fn list_users(_auth: ManagerAuth, db: web::Data<DataLayer>) -> AppResult<HttpResponse> {
    let users = users::list_active(&db).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users).with_message("Get all users successfully")))
}

/// Fetch one active user; `data` is null when none matches.
#[utoipa::path(
    get,
    path = "/api/users/get-user",
    tag = "Users",
    params(UserIdQuery),
    responses(
        (status = 200, description = "User or null", body = Option<User>),
        (status = 400, description = "Missing or invalid id", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[get("/get-user")]
pub async fn get_user(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    query: web::Query<UserIdQuery>,
) -> AppResult<HttpResponse> {
    let id = query_user_id(&query, "Invalid id parameter")?;
    let user = users::find_by_id(&db, id).await?;
    Ok(ok(user))
}

/// Create a user on behalf of an administrator.
#[utoipa::path(
    post,
    path = "/api/users/create",
    tag = "Users",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "User created", body = User),
        (status = 400, description = "Invalid email or gender, or email taken", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/create")]
pub async fn create_user(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<ProfileRequest>,
) -> AppResult<HttpResponse> {
    let input = body.into_inner().into_input()?;

    if users::email_in_use(&db, &input.email).await? {
        return Err(AppError::InvalidInput("Email already exists".to_string()));
    }

    let user = users::create(&db, &input).await?;
    info!("Users: created user {}", user.id);
    Ok(ok(user))
}

/// Update the profile of an active user.
#[utoipa::path(
    post,
    path = "/api/users/update-profile",
    tag = "Users",
    params(UserIdQuery),
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid id, email or gender", body = ErrorResponse),
        (status = 404, description = "User not found or has been deleted", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/update-profile")]
pub async fn update_profile(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    query: web::Query<UserIdQuery>,
    body: web::Json<ProfileRequest>,
) -> AppResult<HttpResponse> {
    let id = query_user_id(&query, "Invalid user id")?;
    let input = body.into_inner().into_input()?;

    match users::update_profile(&db, id, &input).await? {
        Some(user) => Ok(ok(user)),
        None => Err(AppError::NotFound(
            "User not found or has been deleted".to_string(),
        )),
    }
}

/// Soft-delete several users at once.
///
/// Every id must be a positive integer. One mutation per id is issued concurrently; any
/// failure fails the whole request.
#[utoipa::path(
    post,
    path = "/api/users/bulk-delete",
    tag = "Users",
    request_body = UserIdsRequest,
    responses(
        (status = 200, description = "Users deleted", body = BulkDeleteUsersResponse),
        (status = 400, description = "Missing or invalid ids", body = ErrorResponse),
        (status = 500, description = "A delete failed", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/bulk-delete")]
pub async fn bulk_delete_users(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<UserIdsRequest>,
) -> AppResult<HttpResponse> {
    let raw = body
        .user_ids
        .as_deref()
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| AppError::InvalidInput("User IDs array is required".to_string()))?;
    let ids =
        strict_ids(raw).ok_or_else(|| AppError::InvalidInput("Invalid user IDs".to_string()))?;

    let counts = try_join_all(ids.iter().map(|id| users::soft_delete(&db, *id)))
        .await
        .map_err(|e| {
            error!("Users: bulk delete failed: {}", e);
            AppError::OperationFailed("Failed to delete users".to_string())
        })?;

    let deleted_ids: Vec<i64> = ids
        .iter()
        .zip(&counts)
        .filter(|(_, count)| **count > 0)
        .map(|(id, _)| *id)
        .collect();
    let deleted_count: i64 = counts.iter().sum();

    info!("Users: soft-deleted {} user(s)", deleted_count);

    Ok(HttpResponse::Ok().json(BulkDeleteUsersResponse {
        success: true,
        message: format!("Successfully deleted {} user(s)", deleted_count),
        deleted_count,
        deleted_ids,
    }))
}

/// Generate a one-hour password reset link for a user.
#[utoipa::path(
    post,
    path = "/api/users/reset-password",
    tag = "Users",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Reset link generated", body = ResetLinkResponse),
        (status = 400, description = "Missing or invalid user id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/reset-password")]
pub async fn reset_password(
    _auth: ManagerAuth,
    config: web::Data<Config>,
    db: web::Data<DataLayer>,
    body: web::Json<UserIdRequest>,
) -> AppResult<HttpResponse> {
    let user_id = body_user_id(&body)?;
    let reset_link = session::create_reset_link(&db, &config.client_url, user_id).await?;

    info!("Users: generated reset link for user {}", user_id);

    Ok(HttpResponse::Ok().json(ResetLinkResponse {
        success: true,
        reset_link,
        message: "Reset password link generated successfully".to_string(),
    }))
}

/// Revoke every refresh token of a user, forcing a new sign-in once the access token expires.
#[utoipa::path(
    post,
    path = "/api/users/revoke-access",
    tag = "Users",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Access revoked", body = MessageResponse),
        (status = 400, description = "Missing or invalid user id", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/revoke-access")]
pub async fn revoke_access(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<UserIdRequest>,
) -> AppResult<HttpResponse> {
    let user_id = body_user_id(&body)?;

    if !users::exists_active(&db, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let revoked = users::revoke_tokens(&db, user_id).await.map_err(|e| {
        error!("Users: failed to revoke access for {}: {}", user_id, e);
        AppError::OperationFailed("Failed to revoke access".to_string())
    })?;
    if revoked == 0 {
        return Err(AppError::OperationFailed("Failed to revoke access".to_string()));
    }

    info!("Users: revoked access for user {}", user_id);
    Ok(HttpResponse::Ok().json(MessageResponse::new("Access revoked successfully")))
}
