//! Department endpoints, including membership management.

use actix_web::{HttpResponse, delete, get, post, put, web};
use futures_util::future::{try_join, try_join_all};
use serde::Serialize;
use tracing::{error, info};
use utoipa::ToSchema;

use super::{created, ok};
use crate::auth::ManagerAuth;
use crate::db::{DataLayer, departments, memberships};
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::department::validate_department_name;
use crate::models::{
    CreateDepartmentRequest, Department, IdsRequest, MemberUser,
    UpdateDepartmentRequest, UserIdsRequest, non_blank, parse_id_str, unique_ids,
};

/// Department restored instead of created.
#[derive(Debug, Serialize, ToSchema)]
pub struct RestoredDepartmentResponse {
    pub success: bool,
    pub data: Department,
    pub restored: bool,
}

/// Bulk delete result.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkDeleteResult {
    pub count: usize,
    pub ids: Vec<i64>,
}

/// Membership lists returned after a change.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipView {
    pub users_in_department: Vec<MemberUser>,
    pub users_not_in_department: Vec<MemberUser>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddUsersResult {
    pub added: i64,
    pub skipped: usize,
    #[serde(flatten)]
    pub view: MembershipView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUsersResult {
    pub removed: i64,
    pub failed: i64,
    #[serde(flatten)]
    pub view: MembershipView,
}

/// Configure department routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/department")
            .service(list_departments)
            .service(create_department)
            .service(bulk_delete_departments)
            .service(get_department)
            .service(update_department)
            .service(delete_department)
            .service(department_users)
            .service(users_not_in_department)
            .service(add_users)
            .service(remove_users),
    );
}

fn department_id(raw: &str) -> AppResult<i64> {
    parse_id_str(raw).ok_or_else(|| AppError::InvalidInput("Invalid department id".to_string()))
}

fn department_not_found() -> AppError {
    AppError::NotFound("Department not found".to_string())
}

async fn membership_view(db: &DataLayer, department_id: i64) -> AppResult<MembershipView> {
    let (users_in_department, non_members) = try_join(
        memberships::active_members(db, department_id),
        memberships::active_non_members(db, department_id),
    )
    .await?;

    Ok(MembershipView {
        users_in_department,
        users_not_in_department: non_members,
    })
}

fn membership_user_ids(body: &UserIdsRequest) -> AppResult<Vec<i64>> {
    let raw = body
        .user_ids
        .as_deref()
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| AppError::InvalidInput("User IDs are required".to_string()))?;

    let ids = unique_ids(raw);
    if ids.is_empty() {
        return Err(AppError::InvalidInput("Invalid user IDs".to_string()));
    }
    Ok(ids)
}

/// List active departments.
#[utoipa::path(
    get,
    path = "/api/department/get-all",
    tag = "Departments",
    responses(
        (status = 200, description = "Active departments", body = Vec<Department>)
    ),
    security(("session_cookie" = []))
)]
#[get("/get-all")]
pub async fn list_departments(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
) -> AppResult<HttpResponse> {
    Ok(ok(departments::list_active(&db).await?))
}

/// Create a department, or restore a soft-deleted one with the same name.
#[utoipa::path(
    post,
    path = "/api/department/create",
    tag = "Departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 200, description = "Soft-deleted department restored", body = RestoredDepartmentResponse),
        (status = 400, description = "Missing or too long name", body = ErrorResponse),
        (status = 409, description = "Name already in use", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/create")]
pub async fn create_department(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<CreateDepartmentRequest>,
) -> AppResult<HttpResponse> {
    let name = validate_department_name(body.name.as_deref())
        .map_err(|msg| AppError::InvalidInput(msg.to_string()))?;
    let description = non_blank(body.description.as_deref());

    match departments::find_by_name(&db, &name).await? {
        Some(existing) if !existing.is_deleted() => {
            Err(AppError::Conflict("Name already in use".to_string()))
        }
        Some(deleted) => {
            let restored = departments::restore(&db, deleted.id, description.as_deref())
                .await?
                .ok_or_else(|| AppError::Conflict("Name already in use".to_string()))?;
            info!("Departments: restored department {}", restored.id);
            Ok(HttpResponse::Ok().json(RestoredDepartmentResponse {
                success: true,
                data: restored,
                restored: true,
            }))
        }
        None => {
            let department = departments::insert(&db, &name, description.as_deref()).await?;
            info!("Departments: created department {}", department.id);
            Ok(created(department))
        }
    }
}

/// Fetch an active department; `data` is null when none matches.
#[utoipa::path(
    get,
    path = "/api/department/{id}/getDepartmentById",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department or null", body = Option<Department>),
        (status = 400, description = "Invalid department id", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[get("/{id}/getDepartmentById")]
pub async fn get_department(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;
    Ok(ok(departments::find_active(&db, id).await?))
}

/// Replace name, description and visibility of an active department.
#[utoipa::path(
    put,
    path = "/api/department/{id}/updateDepartmentById",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Updated department", body = Department),
        (status = 400, description = "Invalid id or missing field", body = ErrorResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[put("/{id}/updateDepartmentById")]
pub async fn update_department(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
    body: web::Json<UpdateDepartmentRequest>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Name is required".to_string()))?;
    let name = validate_department_name(Some(name))
        .map_err(|msg| AppError::InvalidInput(msg.to_string()))?;
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Description is required".to_string()))?;
    let is_public = body
        .is_public
        .ok_or_else(|| AppError::InvalidInput("isPublic is required".to_string()))?;

    let department = departments::update(&db, id, &name, description, is_public)
        .await?
        .ok_or_else(department_not_found)?;

    Ok(ok(department))
}

/// Soft-delete one department.
#[utoipa::path(
    delete,
    path = "/api/department/{id}/delete",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Deleted department", body = Department),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[delete("/{id}/delete")]
pub async fn delete_department(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;

    let department = departments::find_active(&db, id)
        .await?
        .ok_or_else(department_not_found)?;

    if departments::soft_delete_many(&db, &[id]).await?.is_empty() {
        return Err(department_not_found());
    }

    info!("Departments: soft-deleted department {}", id);
    Ok(ok(department))
}

/// Soft-delete several departments with one mutation.
///
/// Duplicate and invalid ids are dropped; the request fails only when none remain.
#[utoipa::path(
    post,
    path = "/api/department/bulk-delete",
    tag = "Departments",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Departments deleted", body = BulkDeleteResult),
        (status = 400, description = "No valid ids", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/bulk-delete")]
pub async fn bulk_delete_departments(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    body: web::Json<IdsRequest>,
) -> AppResult<HttpResponse> {
    let ids = unique_ids(body.ids.as_deref().unwrap_or_default());
    if ids.is_empty() {
        return Err(AppError::InvalidInput(
            "Invalid department ids".to_string(),
        ));
    }

    let deleted = departments::soft_delete_many(&db, &ids).await.map_err(|e| {
        error!("Departments: bulk delete failed: {}", e);
        AppError::OperationFailed("Failed to delete departments".to_string())
    })?;

    info!("Departments: soft-deleted {} department(s)", deleted.len());

    Ok(ok(BulkDeleteResult {
        count: deleted.len(),
        ids,
    }))
}

/// Active members of a department.
#[utoipa::path(
    get,
    path = "/api/department/{id}/users",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Members", body = Vec<MemberUser>),
        (status = 400, description = "Invalid department id", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[get("/{id}/users")]
pub async fn department_users(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;
    Ok(ok(memberships::active_members(&db, id).await?))
}

/// Active users outside a department.
#[utoipa::path(
    get,
    path = "/api/department/{id}/users-not-in-department",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Non-members", body = Vec<MemberUser>),
        (status = 400, description = "Invalid department id", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[get("/{id}/users-not-in-department")]
pub async fn users_not_in_department(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;
    Ok(ok(memberships::active_non_members(&db, id).await?))
}

/// Add users to a department, skipping existing members.
#[utoipa::path(
    post,
    path = "/api/department/{id}/add-users",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    request_body = UserIdsRequest,
    responses(
        (status = 201, description = "Users added", body = AddUsersResult),
        (status = 400, description = "Invalid ids or all users already members", body = ErrorResponse),
        (status = 404, description = "Department not found", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/{id}/add-users")]
pub async fn add_users(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
    body: web::Json<UserIdsRequest>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;
    let user_ids = membership_user_ids(&body)?;

    if departments::find_active(&db, id).await?.is_none() {
        return Err(department_not_found());
    }

    let existing = memberships::existing_members(&db, id, &user_ids).await?;
    let to_add: Vec<i64> = user_ids
        .iter()
        .copied()
        .filter(|uid| !existing.contains(uid))
        .collect();

    if to_add.is_empty() {
        return Err(AppError::InvalidInput(
            "All users are already in this department".to_string(),
        ));
    }

    let added = memberships::add(&db, id, &to_add).await?;
    info!("Departments: added {} user(s) to department {}", added, id);

    let view = membership_view(&db, id).await?;

    Ok(created(AddUsersResult {
        added,
        skipped: existing.len(),
        view,
    }))
}

/// Remove users from a department.
#[utoipa::path(
    post,
    path = "/api/department/{id}/remove-users",
    tag = "Departments",
    params(("id" = i64, Path, description = "Department id")),
    request_body = UserIdsRequest,
    responses(
        (status = 200, description = "Users removed", body = RemoveUsersResult),
        (status = 400, description = "Invalid ids or nothing removed", body = ErrorResponse)
    ),
    security(("session_cookie" = []))
)]
#[post("/{id}/remove-users")]
pub async fn remove_users(
    _auth: ManagerAuth,
    db: web::Data<DataLayer>,
    path: web::Path<String>,
    body: web::Json<UserIdsRequest>,
) -> AppResult<HttpResponse> {
    let id = department_id(&path)?;
    let user_ids = membership_user_ids(&body)?;

    let removed: i64 = try_join_all(
        user_ids
            .iter()
            .map(|user_id| memberships::remove(&db, id, *user_id)),
    )
    .await?
    .into_iter()
    .sum();

    if removed == 0 {
        return Err(AppError::InvalidInput(
            "No users were removed. They may not exist in this department.".to_string(),
        ));
    }

    info!("Departments: removed {} user(s) from department {}", removed, id);

    let view = membership_view(&db, id).await?;

    Ok(ok(RemoveUsersResult {
        removed,
        failed: 0,
        view,
    }))
}
