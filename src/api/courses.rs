//! Course endpoints.

use actix_web::{HttpResponse, get, post, put, web};
use futures_util::future::try_join_all;
use tracing::{error, info};

use super::departments::BulkDeleteResult;
use super::{created, ok};
use crate::auth::ManagerAuth;
use crate::db::{DataLayer, courses};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{
    Course, CreateCourseRequest, IdsRequest, Role, UpdateCourseRequest, non_blank, parse_id_str,
    unique_ids,
};

/// Configure course routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/course")
            .service(list_courses)
            .service(create_course)
            .service(bulk_delete_courses)
            .service(get_course)
            .service(update_course),
    );
}

fn course_id(raw: &str) -> AppResult<i64> {
    parse_id_str(raw).ok_or_else(|| AppError::InvalidInput("Invalid course id".to_string()))
}

/// List active courses. Department admins only see the courses they created.
#[utoipa::path(
    get,
    path = "/api/course/get-all",
    tag = "Courses",
    responses(
        (status = 200, description = "Active courses", body = Vec<Course>)
    ),
    security(("session_cookie" = []))
)]
#[get("/get-all")]
pub async fn list_courses(auth: ManagerAuth, db: web::Data<DataLayer>) -> AppResult<HttpResponse> {
    let role = auth.role();
    let created_by = (role == Role::DeptAdmin).then(|| auth.user_id());

    let courses = courses::list_active(&db, created_by, Some(role.as_str())).await?;
    Ok(ok(courses))
}

/// Fetch an active course; `data` is null when none matches.
#[utoipa::path(
    get,
    path = "/api/course/{id}/getById",
    tag = "Courses",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course or null", body = Option<Course>),
        (status = 400, description = "Invalid course id", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[get("/{id}/getById")]
pub async fn get_course(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = course_id(&path)?;
    Ok(ok(courses::find_active(&db, id).await?))
}

/// Create a course owned by the caller and link it to departments.
#[utoipa::path(
    post,
    path = "/api/course/create",
    tag = "Courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Missing name", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/create")]
pub async fn create_course(
    auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<CreateCourseRequest>,
) -> AppResult<HttpResponse> {
    let name = non_blank(body.name.as_deref())
        .ok_or_else(|| AppError::InvalidInput("Missing required fields".to_string()))?;
    let description = non_blank(body.description.as_deref());
    let department_ids = unique_ids(body.department_ids.as_deref().unwrap_or_default());

    let course = courses::insert(
        &db,
        &name,
        description.as_deref(),
        auth.user_id(),
        &department_ids,
    )
    .await?;

    info!(
        "Courses: user {} created course {} in {} department(s)",
        auth.user_id(),
        course.id,
        department_ids.len()
    );
    Ok(created(course))
}

/// Rename an active course and replace its description.
#[utoipa::path(
    put,
    path = "/api/course/{id}/updateCourseById",
    tag = "Courses",
    params(("id" = i64, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Updated course", body = Course),
        (status = 400, description = "Invalid id or missing name", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[put("/{id}/updateCourseById")]
pub async fn update_course(
    auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
    body: web::Json<UpdateCourseRequest>,
) -> AppResult<HttpResponse> {
    let id = course_id(&path)?;
    let name = non_blank(body.name.as_deref())
        .ok_or_else(|| AppError::InvalidInput("Name is required".to_string()))?;
    let description = non_blank(body.description.as_deref());

    let course = courses::update(
        &db,
        id,
        &name,
        description.as_deref(),
        Some(auth.role().as_str()),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    Ok(ok(course))
}

/// Soft-delete several courses; one mutation per id, issued concurrently.
#[utoipa::path(
    post,
    path = "/api/course/bulk-delete",
    tag = "Courses",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Courses deleted", body = BulkDeleteResult),
        (status = 400, description = "No valid ids", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/bulk-delete")]
pub async fn bulk_delete_courses(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<IdsRequest>,
) -> AppResult<HttpResponse> {
    let ids = unique_ids(body.ids.as_deref().unwrap_or_default());
    if ids.is_empty() {
        return Err(AppError::InvalidInput("Invalid course ids".to_string()));
    }

    let deleted = try_join_all(ids.iter().map(|id| courses::soft_delete(&db, *id)))
        .await
        .map_err(|e| {
            error!("Courses: bulk delete failed: {}", e);
            AppError::OperationFailed("Failed to delete courses".to_string())
        })?;
    let deleted_ids: Vec<i64> = deleted.into_iter().flatten().collect();

    info!("Courses: soft-deleted {} course(s)", deleted_ids.len());

    Ok(ok(BulkDeleteResult {
        count: deleted_ids.len(),
        ids: deleted_ids,
    }))
}
