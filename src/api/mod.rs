//! API endpoint modules.

pub mod auth;
pub mod courses;
pub mod departments;
pub mod health;
pub mod openapi;
pub mod uploads;
pub mod users;

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::error::AppError;
use crate::models::ApiResponse;

pub use auth::configure_routes as configure_auth_routes;
pub use courses::configure_routes as configure_course_routes;
pub use departments::configure_routes as configure_department_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use uploads::configure_routes as configure_upload_routes;
pub use users::configure_routes as configure_user_routes;

/// Register every `/api` route on a service config.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_auth_routes)
        .configure(configure_user_routes)
        .configure(configure_department_routes)
        .configure(configure_course_routes)
        .configure(configure_upload_routes);
}

/// JSON extractor config rendering malformed bodies in the error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::InvalidInput(format!("Invalid request body: {}", err)).into()
    })
}

/// Query extractor config rendering malformed query strings in the error envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::InvalidInput(format!("Invalid query string: {}", err)).into()
    })
}

/// 200 with `{ success: true, data }`.
pub(crate) fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(data))
}

/// 201 with `{ success: true, data }`.
pub(crate) fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::ok(data))
}
