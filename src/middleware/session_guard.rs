//! Session guard middleware.
//!
//! Runs before routing for every request:
//! 1. Verifies the access token cookie.
//! 2. When there is no valid access token but a refresh cookie is present on a protected
//!    route, rotates the refresh token once and carries on with the new session. The new
//!    cookies are appended to whatever response the request produces.
//! 3. Redirects signed-in users away from the login/register pages, rejects anonymous
//!    requests to protected routes, and keeps `USER` accounts out of the management API.

use std::future::{Ready, ready};
use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header;
use actix_web::{Error, HttpMessage, HttpResponse, ResponseError, web};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, error, warn};

use crate::auth::{ACCESS_COOKIE, REFRESH_COOKIE, verify_session_token};
use crate::config::Config;
use crate::db::DataLayer;
use crate::error::{AppError, ErrorResponse};
use crate::models::SessionClaims;
use crate::services::session::{self, IssuedSession};

/// Sign-in page.
pub const LOGIN_PAGE: &str = "/auth/login";
/// Registration page.
pub const REGISTER_PAGE: &str = "/auth/register";
/// Landing page for signed-in users.
pub const HOME_PAGE: &str = "/";
/// Landing page of password reset links.
pub const RESET_PASSWORD_PAGE: &str = "/auth/reset-password";
/// Refresh endpoint; never refreshed implicitly.
pub const REFRESH_ROUTE: &str = "/api/auth/refresh";

/// Pages only meaningful without a session.
const AUTH_PAGES: &[&str] = &[LOGIN_PAGE, REGISTER_PAGE];

/// Pages reachable with or without a session.
const OPEN_PAGES: &[&str] = &[RESET_PASSWORD_PAGE];

/// Path prefixes reachable without a session.
const PUBLIC_PREFIXES: &[&str] = &[
    "/_next",
    "/static",
    "/favicon.ico",
    "/api/auth",
    "/api/health",
    "/api/ready",
    "/swagger-ui",
    "/api-docs",
    "/assets",
];

/// Whether a path is reachable without a session.
pub fn is_public_route(path: &str) -> bool {
    AUTH_PAGES.contains(&path)
        || OPEN_PAGES.contains(&path)
        || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

fn is_auth_page(path: &str) -> bool {
    AUTH_PAGES.contains(&path)
}

fn is_api_route(path: &str) -> bool {
    path.starts_with("/api")
}

/// Whether a path belongs to the role-restricted management API.
fn is_management_api(path: &str) -> bool {
    is_api_route(path) && !is_public_route(path)
}

/// Whether the guard should try a transparent refresh for this request.
fn should_attempt_refresh(path: &str, has_session: bool, has_refresh_cookie: bool) -> bool {
    !has_session && has_refresh_cookie && !is_public_route(path) && !path.starts_with(REFRESH_ROUTE)
}

/// Outcome of classifying a request.
#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Continue,
    RedirectHome,
    RedirectLogin,
    Unauthorized,
    Forbidden,
}

fn decide(path: &str, claims: Option<&SessionClaims>) -> Decision {
    match claims {
        Some(_) if is_auth_page(path) => Decision::RedirectHome,
        Some(claims) if is_management_api(path) && !claims.role().can_manage() => {
            Decision::Forbidden
        }
        Some(_) => Decision::Continue,
        None if is_public_route(path) => Decision::Continue,
        None if is_api_route(path) => Decision::Unauthorized,
        None => Decision::RedirectLogin,
    }
}

/// Session guard middleware factory.
pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionGuardMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let (Some(config), Some(db)) = (
                req.app_data::<web::Data<Config>>().cloned(),
                req.app_data::<web::Data<DataLayer>>().cloned(),
            ) else {
                error!("Session guard: application state is not configured");
                let response = HttpResponse::InternalServerError().json(ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "Internal configuration error",
                ));
                return Ok(req.into_response(response).map_into_right_body());
            };

            let path = req.path().to_string();

            let mut claims = req
                .cookie(ACCESS_COOKIE)
                .and_then(|c| verify_session_token(c.value(), &config.session.jwt_secret).ok());

            let refresh_cookie = req.cookie(REFRESH_COOKIE);
            let mut refreshed: Option<IssuedSession> = None;

            if should_attempt_refresh(&path, claims.is_some(), refresh_cookie.is_some()) {
                if let Some(cookie) = refresh_cookie {
                    match session::rotate(&db, &config.session, cookie.value()).await {
                        Ok(issued) => {
                            debug!("Session guard: refreshed session for user {}", issued.user.id);
                            claims = Some(issued.claims.clone());
                            refreshed = Some(issued);
                        }
                        Err(e) => {
                            warn!("Session guard: transparent refresh failed: {}", e);
                        }
                    }
                }
            }

            if let Some(ref claims) = claims {
                req.extensions_mut().insert(claims.clone());
            }

            let early_response = match decide(&path, claims.as_ref()) {
                Decision::Continue => None,
                Decision::RedirectHome => Some(redirect(HOME_PAGE)),
                Decision::RedirectLogin => Some(redirect(LOGIN_PAGE)),
                Decision::Unauthorized => {
                    Some(AppError::Unauthorized("Unauthorized".to_string()).error_response())
                }
                Decision::Forbidden => {
                    Some(AppError::Forbidden("Insufficient permissions".to_string()).error_response())
                }
            };

            let mut res = match early_response {
                Some(response) => req.into_response(response).map_into_right_body(),
                None => service.call(req).await?.map_into_left_body(),
            };

            if let Some(issued) = refreshed {
                for cookie in issued.cookies(&config.session) {
                    if let Err(e) = res.response_mut().add_cookie(&cookie) {
                        warn!("Session guard: failed to attach refreshed cookie: {}", e);
                    }
                }
            }

            Ok(res)
        })
    }
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}
