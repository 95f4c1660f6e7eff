//! Session tokens, session cookies and password hashing.
//!
//! # Security
//! - Signing secrets are held in `SecretString` and never logged
//! - Access tokens are HS256 JWTs with a fixed issuer
//! - Passwords are hashed with Argon2id and a random salt

mod extractor;

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};

use crate::config::SessionSettings;
use crate::error::{AppError, AppResult};
use crate::models::{PublicUser, SessionClaims};

pub use extractor::{ManagerAuth, SessionAuth};
pub(crate) use extractor::request_claims;

/// Access token cookie.
pub const ACCESS_COOKIE: &str = "auth_token";
/// Refresh token cookie.
pub const REFRESH_COOKIE: &str = "auth_refresh_token";
/// Session JWT issuer.
pub const SESSION_ISSUER: &str = "course-admin";
/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Sign an access token for a user, returning the token and its claims.
pub fn create_access_token(
    user: &PublicUser,
    settings: &SessionSettings,
) -> AppResult<(String, SessionClaims)> {
    let now = chrono::Utc::now();
    let exp = expiry_after(now, settings.access_token_ttl_secs)?;

    let claims = SessionClaims {
        sub: user.id.to_string(),
        iss: SESSION_ISSUER.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
        user_id: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
    };

    let key = EncodingKey::from_secret(settings.jwt_secret.expose_secret().as_bytes());
    let token = encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("Failed to create access token: {}", e)))?;

    Ok((token, claims))
}

/// `now + ttl_secs`, or an error when the lifetime does not fit a timestamp.
pub fn expiry_after(
    now: chrono::DateTime<chrono::Utc>,
    ttl_secs: u64,
) -> AppResult<chrono::DateTime<chrono::Utc>> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::Internal(format!("Token lifetime of {}s is out of range", ttl_secs))
        })
}

/// Verify an access token JWT and return claims.
pub fn verify_session_token(token: &str, secret: &SecretString) -> Result<SessionClaims, String> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[SESSION_ISSUER]);
    validation.validate_aud = false;

    let token_data = decode::<SessionClaims>(token, &key, &validation)
        .map_err(|e| format!("Invalid session token: {}", e))?;

    Ok(token_data.claims)
}

/// Build an HttpOnly session cookie living for `max_age_secs`.
pub fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: u64,
    secure: bool,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_max_age(CookieDuration::seconds(max_age_secs as i64));
    cookie
}

/// Build a cookie that removes `name` from the browser.
pub fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    session_cookie(name, String::new(), 0, secure)
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
