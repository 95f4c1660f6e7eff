//! Actix-web extractors for session authentication.
//!
//! Claims attached by the session guard (after a transparent refresh) take precedence;
//! otherwise the access token cookie is verified directly.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest, web};

use super::{ACCESS_COOKIE, verify_session_token};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{Role, SessionClaims};

/// Resolve the session claims for a request, if any.
pub(crate) fn request_claims(req: &HttpRequest) -> Result<Option<SessionClaims>, AppError> {
    if let Some(claims) = req.extensions().get::<SessionClaims>() {
        return Ok(Some(claims.clone()));
    }

    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Internal("Internal configuration error".to_string()))?;

    Ok(req.cookie(ACCESS_COOKIE).and_then(|cookie| {
        verify_session_token(cookie.value(), &config.session.jwt_secret).ok()
    }))
}

/// Extractor that requires a valid session.
///
/// ```ignore
/// async fn handler(auth: SessionAuth) -> impl Responder {
///     // auth.claims.user_id is the signed-in user
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionAuth {
    pub claims: SessionClaims,
}

impl SessionAuth {
    pub fn user_id(&self) -> i64 {
        self.claims.user_id
    }

    pub fn role(&self) -> Role {
        self.claims.role()
    }
}

impl FromRequest for SessionAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(match request_claims(req) {
            Ok(Some(claims)) => Ok(SessionAuth { claims }),
            Ok(None) => Err(AppError::Unauthorized(
                "Authentication required".to_string(),
            )),
            Err(e) => Err(e),
        })
    }
}

/// Extractor that requires a session with a management role.
#[derive(Debug, Clone)]
pub struct ManagerAuth(pub SessionAuth);

impl FromRequest for ManagerAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        ready(
            SessionAuth::from_request(req, payload)
                .into_inner()
                .and_then(|auth| {
                    if auth.role().can_manage() {
                        Ok(ManagerAuth(auth))
                    } else {
                        Err(AppError::Forbidden("Insufficient permissions".to_string()))
                    }
                }),
        )
    }
}

impl std::ops::Deref for ManagerAuth {
    type Target = SessionAuth;

    fn deref(&self) -> &SessionAuth {
        &self.0
    }
}
