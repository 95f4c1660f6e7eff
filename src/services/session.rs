//! Session lifecycle: login, registration, refresh-token rotation, logout and
//! password changes.
//!
//! The stored refresh credential is the SHA-256 hash of the cookie value. Rotation is a
//! compare-and-set on that hash, so a refresh token can be redeemed at most once.

use actix_web::HttpResponseBuilder;
use actix_web::cookie::Cookie;
use tracing::{info, warn};

use crate::auth::{
    ACCESS_COOKIE, MIN_PASSWORD_LENGTH, REFRESH_COOKIE, create_access_token, expired_cookie,
    expiry_after, hash_password, session_cookie, verify_password,
};
use crate::config::SessionSettings;
use crate::db::{DataLayer, departments, memberships, sessions, users};
use crate::error::{AppError, AppResult};
use crate::models::department::GENERAL_DEPARTMENT_NAME;
use crate::models::{PublicUser, Role, SessionClaims};

/// Lifetime of a password reset code.
const RESET_CODE_TTL_SECS: i64 = 60 * 60;

/// Freshly issued credentials for one user.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: PublicUser,
    pub claims: SessionClaims,
    pub access_token: String,
    pub refresh_token: String,
}

impl IssuedSession {
    /// Cookies carrying both tokens.
    pub fn cookies(&self, settings: &SessionSettings) -> [Cookie<'static>; 2] {
        [
            session_cookie(
                ACCESS_COOKIE,
                self.access_token.clone(),
                settings.access_token_ttl_secs,
                settings.secure_cookies,
            ),
            session_cookie(
                REFRESH_COOKIE,
                self.refresh_token.clone(),
                settings.refresh_token_ttl_secs,
                settings.secure_cookies,
            ),
        ]
    }

    /// Attach both cookies to a response.
    pub fn apply(&self, response: &mut HttpResponseBuilder, settings: &SessionSettings) {
        for cookie in self.cookies(settings) {
            response.cookie(cookie);
        }
    }
}

/// Cookies removing both tokens.
pub fn cleared_cookies(settings: &SessionSettings) -> [Cookie<'static>; 2] {
    [
        expired_cookie(ACCESS_COOKIE, settings.secure_cookies),
        expired_cookie(REFRESH_COOKIE, settings.secure_cookies),
    ]
}

/// Normalise an email for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn refresh_expiry(settings: &SessionSettings) -> AppResult<String> {
    Ok(expiry_after(chrono::Utc::now(), settings.refresh_token_ttl_secs)?.to_rfc3339())
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

/// Verify credentials and issue a new token pair.
pub async fn login(
    db: &DataLayer,
    settings: &SessionSettings,
    email: &str,
    password: &str,
) -> AppResult<IssuedSession> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password are required".to_string(),
        ));
    }

    let row = sessions::find_login_user(db, &email)
        .await?
        .ok_or_else(invalid_credentials)?;
    let (user, password_hash) = row.into_public();

    let password_hash = password_hash.ok_or_else(invalid_credentials)?;
    if !verify_password(password, &password_hash) {
        warn!("Login: password mismatch for user {}", user.id);
        return Err(invalid_credentials());
    }

    let (access_token, claims) = create_access_token(&user, settings)?;
    let refresh_token = sessions::generate_refresh_token();
    sessions::store_refresh_hash(
        db,
        user.id,
        &sessions::hash_token(&refresh_token),
        &refresh_expiry(settings)?,
    )
    .await?;

    info!("Login: user {} signed in", user.id);

    Ok(IssuedSession {
        user,
        claims,
        access_token,
        refresh_token,
    })
}

/// Redeem a refresh token for a new token pair.
///
/// Fails with `Unauthorized` when the token is unknown, expired, belongs to a deleted
/// user, or was already redeemed by a concurrent request.
pub async fn rotate(
    db: &DataLayer,
    settings: &SessionSettings,
    raw_refresh_token: &str,
) -> AppResult<IssuedSession> {
    let old_hash = sessions::hash_token(raw_refresh_token);
    let user = sessions::find_by_refresh_hash(db, &old_hash)
        .await?
        .ok_or_else(|| {
            warn!("Refresh: invalid or expired refresh token");
            AppError::Unauthorized("Invalid or expired refresh token".to_string())
        })?;

    let refresh_token = sessions::generate_refresh_token();
    let rotated = sessions::rotate_refresh_hash(
        db,
        user.id,
        &old_hash,
        &sessions::hash_token(&refresh_token),
        &refresh_expiry(settings)?,
    )
    .await?;

    if !rotated {
        warn!("Refresh: token for user {} was already used", user.id);
        return Err(AppError::Unauthorized(
            "Invalid or expired refresh token".to_string(),
        ));
    }

    let (access_token, claims) = create_access_token(&user, settings)?;

    Ok(IssuedSession {
        user,
        claims,
        access_token,
        refresh_token,
    })
}

/// Forget the stored refresh token. Failures are logged and swallowed.
pub async fn logout(db: &DataLayer, raw_refresh_token: Option<&str>) {
    let Some(raw) = raw_refresh_token else {
        return;
    };

    if let Err(e) = sessions::clear_refresh_hash(db, &sessions::hash_token(raw)).await {
        warn!("Logout: failed to clear refresh token: {}", e);
    }
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration<'a> {
    pub name: Option<&'a str>,
    pub email: &'a str,
    pub password: &'a str,
}

/// Create a self-registered `USER` account and add it to the general department.
pub async fn register(db: &DataLayer, input: Registration<'_>) -> AppResult<PublicUser> {
    let email = normalize_email(input.email);
    if email.is_empty() || input.password.is_empty() {
        return Err(AppError::InvalidInput("Missing fields".to_string()));
    }
    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if users::email_in_use(db, &email).await? {
        return Err(AppError::InvalidInput("Email already exists".to_string()));
    }

    let password_hash = hash_password(input.password)?;
    let name = input.name.map(str::trim).filter(|n| !n.is_empty());

    let user = sessions::insert_credential_user(
        db,
        &sessions::NewCredentialUser {
            email: &email,
            name,
            password_hash: &password_hash,
            role: Role::User.as_str(),
            provider: users::PROVIDER_EMAIL_PASSWORD,
        },
    )
    .await?;

    if let Err(e) = join_general_department(db, user.id).await {
        warn!(
            "Register: failed to add user {} to {}: {}",
            user.id, GENERAL_DEPARTMENT_NAME, e
        );
    }

    info!("Register: created user {}", user.id);
    Ok(user)
}

async fn join_general_department(db: &DataLayer, user_id: i64) -> AppResult<()> {
    let department_id = departments::find_or_create(db, GENERAL_DEPARTMENT_NAME).await?;
    memberships::add(db, department_id, &[user_id]).await?;
    Ok(())
}

/// Password change input.
#[derive(Debug, Clone)]
pub struct PasswordChange<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
    pub confirm_password: &'a str,
}

/// Validate a password change before touching the database.
pub fn validate_password_change(change: &PasswordChange<'_>) -> AppResult<()> {
    if change.current_password.is_empty()
        || change.new_password.is_empty()
        || change.confirm_password.is_empty()
    {
        return Err(AppError::InvalidInput(
            "All fields are required".to_string(),
        ));
    }
    if change.new_password != change.confirm_password {
        return Err(AppError::InvalidInput(
            "New passwords do not match".to_string(),
        ));
    }
    if change.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if change.new_password == change.current_password {
        return Err(AppError::InvalidInput(
            "New password must be different from current password".to_string(),
        ));
    }
    Ok(())
}

/// Change the password of a signed-in user.
pub async fn change_password(
    db: &DataLayer,
    user_id: i64,
    change: PasswordChange<'_>,
) -> AppResult<()> {
    validate_password_change(&change)?;

    let row = sessions::find_credentials(db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let stored = row.password.ok_or_else(|| {
        AppError::InvalidInput("User does not have a password set".to_string())
    })?;

    if !verify_password(change.current_password, &stored) {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = hash_password(change.new_password)?;
    sessions::update_password(db, user_id, &new_hash).await?;

    info!("Password changed for user {}", user_id);
    Ok(())
}

/// Generate a one-hour reset code for an active user and return the reset link.
pub async fn create_reset_link(db: &DataLayer, client_url: &str, user_id: i64) -> AppResult<String> {
    if !users::exists_active(db, user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let code = sessions::generate_reset_code();
    let expires_at =
        (chrono::Utc::now() + chrono::Duration::seconds(RESET_CODE_TTL_SECS)).to_rfc3339();

    users::set_reset_code(db, user_id, &sessions::hash_token(&code), &expires_at)
        .await
        .map_err(|e| {
            warn!("Reset password: failed to store code for {}: {}", user_id, e);
            AppError::Internal("Failed to generate reset code".to_string())
        })?;

    Ok(reset_link(client_url, &code))
}

/// Build the client-side reset link for a code.
pub fn reset_link(client_url: &str, code: &str) -> String {
    format!(
        "{}/auth/reset-password?oobCode={}",
        client_url.trim_end_matches('/'),
        urlencoding::encode(code)
    )
}

/// Redeem a reset code, setting a new password and revoking every refresh token.
pub async fn complete_reset(db: &DataLayer, code: &str, new_password: &str) -> AppResult<()> {
    let invalid = || AppError::InvalidInput("Invalid or expired reset code".to_string());

    if code.trim().is_empty() {
        return Err(invalid());
    }
    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let code_hash = sessions::hash_token(code.trim());
    let user = sessions::find_by_reset_hash(db, &code_hash)
        .await?
        .ok_or_else(invalid)?;

    let new_hash = hash_password(new_password)?;
    if !sessions::complete_password_reset(db, user.id, &code_hash, &new_hash).await? {
        return Err(invalid());
    }

    info!("Password reset completed for user {}", user.id);
    Ok(())
}
