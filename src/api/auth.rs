//! Session endpoints: login, registration, refresh, logout, current user and
//! password management.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{created, ok};
use crate::auth::{REFRESH_COOKIE, SessionAuth, request_claims};
use crate::config::Config;
use crate::db::{DataLayer, sessions};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{MessageResponse, PublicUser};
use crate::services::session::{self, IssuedSession, PasswordChange, Registration};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResetRequest {
    pub oob_code: Option<String>,
    pub new_password: Option<String>,
}

/// Body returned when a session is issued. The access token is also set as a cookie.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub data: PublicUser,
    pub token: String,
}

/// Configure session routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(register)
        .service(refresh)
        .service(logout)
        .service(current_user)
        .service(change_password)
        .service(confirm_password_reset);
}

fn session_response(issued: &IssuedSession, config: &Config) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    issued.apply(&mut response, &config.session);
    response.json(SessionResponse {
        success: true,
        data: issued.user.clone(),
        token: issued.access_token.clone(),
    })
}

/// Sign in with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookies set", body = SessionResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
#[post("/auth/login")]
pub async fn login(
    config: web::Data<Config>,
    db: web::Data<DataLayer>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let issued = session::login(
        &db,
        &config.session,
        body.email.as_deref().unwrap_or_default(),
        body.password.as_deref().unwrap_or_default(),
    )
    .await?;

    Ok(session_response(&issued, &config))
}

/// Create a `USER` account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = PublicUser),
        (status = 400, description = "Missing fields, weak password or email taken", body = ErrorResponse)
    )
)]
#[post("/auth/register")]
pub async fn register(
    db: web::Data<DataLayer>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let user = session::register(
        &db,
        Registration {
            name: body.name.as_deref(),
            email: body.email.as_deref().unwrap_or_default(),
            password: body.password.as_deref().unwrap_or_default(),
        },
    )
    .await?;

    Ok(created(user))
}

/// Exchange the refresh cookie for a new token pair.
///
/// The presented refresh token is invalidated; replaying it fails with 401.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Session rotated; cookies replaced", body = SessionResponse),
        (status = 401, description = "Missing, invalid, expired or reused refresh token", body = ErrorResponse)
    )
)]
#[post("/auth/refresh")]
pub async fn refresh(
    req: HttpRequest,
    config: web::Data<Config>,
    db: web::Data<DataLayer>,
) -> AppResult<HttpResponse> {
    let refresh_token = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("No refresh token".to_string()))?;

    let issued = session::rotate(&db, &config.session, &refresh_token).await?;

    Ok(session_response(&issued, &config))
}

/// Sign out: forget the refresh token and clear both cookies.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out", body = MessageResponse)
    )
)]
#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    db: web::Data<DataLayer>,
) -> HttpResponse {
    let refresh_token = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());
    session::logout(&db, refresh_token.as_deref()).await;

    let mut response = HttpResponse::Ok();
    for cookie in session::cleared_cookies(&config.session) {
        response.cookie(cookie);
    }
    response.json(MessageResponse::new("Logged out successfully"))
}

/// Current signed-in user, or `null`.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user or null", body = Option<PublicUser>)
    )
)]
#[get("/auth/me")]
pub async fn current_user(
    req: HttpRequest,
    db: web::Data<DataLayer>,
) -> AppResult<HttpResponse> {
    let user = match request_claims(&req)? {
        Some(claims) => sessions::find_session_user(&db, claims.user_id).await?,
        None => None,
    };

    Ok(ok(user))
}

/// Change the password of the signed-in user.
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not signed in or wrong current password", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/auth/change-password")]
pub async fn change_password(
    auth: SessionAuth,
    db: web::Data<DataLayer>,
    body: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    session::change_password(
        &db,
        auth.user_id(),
        PasswordChange {
            current_password: body.current_password.as_deref().unwrap_or_default(),
            new_password: body.new_password.as_deref().unwrap_or_default(),
            confirm_password: body.confirm_password.as_deref().unwrap_or_default(),
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password changed successfully")))
}

/// Set a new password using the code from a reset link.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ConfirmResetRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired code, or weak password", body = ErrorResponse)
    )
)]
#[post("/auth/reset-password")]
pub async fn confirm_password_reset(
    db: web::Data<DataLayer>,
    body: web::Json<ConfirmResetRequest>,
) -> AppResult<HttpResponse> {
    session::complete_reset(
        &db,
        body.oob_code.as_deref().unwrap_or_default(),
        body.new_password.as_deref().unwrap_or_default(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password reset successfully")))
}
