//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::auth::ACCESS_COOKIE;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Course Admin Server",
        version = "0.3.0",
        description = "Admin API for courses, departments and users backed by Hasura GraphQL, with cookie sessions and avatar uploads"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Session endpoints
        api::auth::login,
        api::auth::register,
        api::auth::refresh,
        api::auth::logout,
        api::auth::current_user,
        api::auth::change_password,
        api::auth::confirm_password_reset,
        // User endpoints
        api::users::list_users,
        api::users::get_user,
        api::users::create_user,
        api::users::update_profile,
        api::users::bulk_delete_users,
        api::users::reset_password,
        api::users::revoke_access,
        // Department endpoints
        api::departments::list_departments,
        api::departments::create_department,
        api::departments::get_department,
        api::departments::update_department,
        api::departments::delete_department,
        api::departments::bulk_delete_departments,
        api::departments::department_users,
        api::departments::users_not_in_department,
        api::departments::add_users,
        api::departments::remove_users,
        // Course endpoints
        api::courses::list_courses,
        api::courses::get_course,
        api::courses::create_course,
        api::courses::update_course,
        api::courses::bulk_delete_courses,
        // Uploads
        api::uploads::upload_avatar,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            models::MessageResponse,
            models::IdsRequest,
            models::UserIdsRequest,
            models::UserIdRequest,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Sessions
            models::PublicUser,
            api::auth::LoginRequest,
            api::auth::RegisterRequest,
            api::auth::ChangePasswordRequest,
            api::auth::ConfirmResetRequest,
            api::auth::SessionResponse,
            // Users
            models::User,
            models::UserSummary,
            api::users::ProfileRequest,
            api::users::BulkDeleteUsersResponse,
            api::users::ResetLinkResponse,
            // Departments
            models::Department,
            models::MemberUser,
            models::CreateDepartmentRequest,
            models::UpdateDepartmentRequest,
            api::departments::RestoredDepartmentResponse,
            api::departments::BulkDeleteResult,
            api::departments::MembershipView,
            api::departments::AddUsersResult,
            api::departments::RemoveUsersResult,
            // Courses
            models::Course,
            models::CreateCourseRequest,
            models::UpdateCourseRequest,
            // Uploads
            api::uploads::AvatarUploadResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Sessions, registration and passwords"),
        (name = "Users", description = "User management"),
        (name = "Departments", description = "Departments and membership"),
        (name = "Courses", description = "Course management"),
        (name = "Uploads", description = "Avatar uploads")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add the session cookie security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Cookie(
                        utoipa::openapi::security::ApiKeyValue::new(ACCESS_COOKIE),
                    ),
                ),
            );
        }
    }
}
