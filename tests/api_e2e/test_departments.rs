//! E2E tests: department CRUD and membership management.

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use super::mock_graphql::MockGraphql;
use super::test_helpers::*;

fn department(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "Numbers",
        "isPublic": true,
        "createdAt": "2025-01-01T00:00:00Z",
        "updatedAt": "2025-01-01T00:00:00Z"
    })
}

fn member(id: i64) -> Value {
    json!({ "id": id, "email": format!("user{}@example.com", id), "name": null, "role": "USER" })
}

/// Department 3 has members 5 and 6; user 7 is outside it.
fn with_membership(graphql: &MockGraphql) {
    graphql
        .on(
            "GetDepartmentById",
            json!({ "Department": [department(3, "Math")] }),
        )
        .on(
            "GetUserIdsInDepartment",
            json!({ "_UserDepartments": [{ "A": 5 }, { "A": 6 }] }),
        )
        .on("GetUsersByIds", json!({ "User": [member(5), member(6)] }))
        .on(
            "GetAllActiveUsers",
            json!({ "User": [member(5), member(6), member(7)] }),
        );
}

#[actix_rt::test]
async fn test_list_departments() {
    let graphql = MockGraphql::new();
    graphql.on(
        "GetAllDepartments",
        json!({ "Department": [department(1, "Math"), department(2, "Art")] }),
    );
    let app = create_app(graphql).await;

    let req = test::TestRequest::get()
        .uri("/api/department/get-all")
        .cookie(dept_admin_cookie())
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"].as_array().unwrap().len(), 2);
    assert_eq!(resp.body["data"][0]["isPublic"], true);
}

#[actix_rt::test]
async fn test_create_department() {
    let graphql = MockGraphql::new();
    graphql
        .on("FindDepartmentByName", json!({ "Department": [] }))
        .on(
            "CreateDepartment",
            json!({ "insert_Department_one": department(9, "Math") }),
        );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/create")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "  Math ", "description": "Numbers" }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["data"]["id"], 9);
    assert!(resp.body.get("restored").is_none());

    let insert = &graphql.calls_to("CreateDepartment")[0];
    assert_eq!(insert.variables["object"]["name"], "Math");
    assert_eq!(insert.variables["object"]["description"], "Numbers");
}

#[actix_rt::test]
async fn test_create_department_with_active_name_conflicts() {
    let graphql = MockGraphql::new();
    graphql.on(
        "FindDepartmentByName",
        json!({ "Department": [{ "id": 3, "name": "Math", "deletedAt": null }] }),
    );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/create")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "Math" }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.body["error"], "Name already in use");
    assert_eq!(graphql.call_count("CreateDepartment"), 0);
}

#[actix_rt::test]
async fn test_create_department_restores_deleted_one() {
    let graphql = MockGraphql::new();
    graphql
        .on(
            "FindDepartmentByName",
            json!({ "Department": [{ "id": 3, "name": "Math", "deletedAt": "2025-02-01T00:00:00Z" }] }),
        )
        .on(
            "RestoreDepartment",
            json!({ "update_Department": { "affected_rows": 1, "returning": [department(3, "Math")] } }),
        );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/create")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "Math", "description": "Numbers" }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["restored"], true);
    assert_eq!(resp.body["data"]["id"], 3);
    assert_eq!(
        graphql.calls_to("RestoreDepartment")[0].variables["description"],
        "Numbers"
    );
    assert_eq!(graphql.call_count("CreateDepartment"), 0);
}

#[actix_rt::test]
async fn test_create_department_validates_name() {
    let graphql = MockGraphql::new();
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/create")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "   " }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "Missing fields");

    let req = test::TestRequest::post()
        .uri("/api/department/create")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "x".repeat(51) }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.body["error"],
        "Department name must be at most 50 characters"
    );

    assert!(graphql.calls().is_empty());
}

#[actix_rt::test]
async fn test_get_department() {
    let graphql = MockGraphql::new();
    graphql.on_fn("GetDepartmentById", |vars| {
        let rows = if vars["id"] == 3 {
            vec![department(3, "Math")]
        } else {
            vec![]
        };
        Ok(json!({ "Department": rows }))
    });
    let app = create_app(graphql).await;

    let req = test::TestRequest::get()
        .uri("/api/department/3/getDepartmentById")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["name"], "Math");

    let req = test::TestRequest::get()
        .uri("/api/department/4/getDepartmentById")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["data"].is_null());

    let req = test::TestRequest::get()
        .uri("/api/department/abc/getDepartmentById")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "Invalid department id");
}

#[actix_rt::test]
async fn test_update_department() {
    let graphql = MockGraphql::new();
    graphql.on_fn("UpdateDepartment", |vars| {
        if vars["id"] == 3 {
            Ok(json!({ "update_Department": {
                "affected_rows": 1,
                "returning": [department(3, "Algebra")]
            }}))
        } else {
            Ok(json!({ "update_Department": { "affected_rows": 0, "returning": [] } }))
        }
    });
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::put()
        .uri("/api/department/3/updateDepartmentById")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "Algebra", "description": "Numbers" }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "isPublic is required");

    let req = test::TestRequest::put()
        .uri("/api/department/3/updateDepartmentById")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "Algebra", "isPublic": false }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "Description is required");

    for blank in ["", "   "] {
        let req = test::TestRequest::put()
            .uri("/api/department/3/updateDepartmentById")
            .cookie(admin_cookie())
            .set_json(json!({ "name": "Algebra", "description": blank, "isPublic": true }))
            .to_request();
        let resp = send(&app, req).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body["error"], "Description is required");
    }
    assert_eq!(graphql.call_count("UpdateDepartment"), 0);

    let req = test::TestRequest::put()
        .uri("/api/department/3/updateDepartmentById")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "Algebra", "description": "  Numbers  ", "isPublic": false }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["name"], "Algebra");

    let update = &graphql.calls_to("UpdateDepartment")[0];
    assert_eq!(update.variables["description"], "Numbers");
    assert_eq!(update.variables["isPublic"], false);

    let req = test::TestRequest::put()
        .uri("/api/department/8/updateDepartmentById")
        .cookie(admin_cookie())
        .set_json(json!({ "name": "Algebra", "description": "Numbers", "isPublic": true }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"], "Department not found");
}

#[actix_rt::test]
async fn test_delete_department() {
    let graphql = MockGraphql::new();
    graphql
        .on_fn("GetDepartmentById", |vars| {
            let rows = if vars["id"] == 3 {
                vec![department(3, "Math")]
            } else {
                vec![]
            };
            Ok(json!({ "Department": rows }))
        })
        .on(
            "SoftDeleteDepartments",
            json!({ "update_Department": { "affected_rows": 1, "returning": [{ "id": 3 }] } }),
        );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::delete()
        .uri("/api/department/3/delete")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["id"], 3);
    assert_eq!(
        graphql.calls_to("SoftDeleteDepartments")[0].variables["ids"],
        json!([3])
    );

    let req = test::TestRequest::delete()
        .uri("/api/department/4/delete")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(graphql.call_count("SoftDeleteDepartments"), 1);
}

#[actix_rt::test]
async fn test_bulk_delete_departments_drops_bad_ids() {
    let graphql = MockGraphql::new();
    graphql.on(
        "SoftDeleteDepartments",
        json!({ "update_Department": { "affected_rows": 1, "returning": [{ "id": 1 }] } }),
    );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/bulk-delete")
        .cookie(admin_cookie())
        .set_json(json!({ "ids": [1, "2", 2, "x", -4] }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["count"], 1);
    assert_eq!(resp.body["data"]["ids"], json!([1, 2]));

    let calls = graphql.calls_to("SoftDeleteDepartments");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].variables["ids"], json!([1, 2]));
}

#[actix_rt::test]
async fn test_bulk_delete_departments_errors() {
    let graphql = MockGraphql::new();
    graphql.fail("SoftDeleteDepartments", "constraint violation");
    let app = create_app(graphql).await;

    let req = test::TestRequest::post()
        .uri("/api/department/bulk-delete")
        .cookie(admin_cookie())
        .set_json(json!({ "ids": ["x"] }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "Invalid department ids");

    let req = test::TestRequest::post()
        .uri("/api/department/bulk-delete")
        .cookie(admin_cookie())
        .set_json(json!({ "ids": [1] }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body["error"], "Failed to delete departments");
}

#[actix_rt::test]
async fn test_department_member_lists() {
    let graphql = MockGraphql::new();
    with_membership(&graphql);
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/department/3/users")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], json!([member(5), member(6)]));
    assert_eq!(
        graphql.calls_to("GetUsersByIds")[0].variables["userIds"],
        json!([5, 6])
    );

    let req = test::TestRequest::get()
        .uri("/api/department/3/users-not-in-department")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], json!([member(7)]));
}

#[actix_rt::test]
async fn test_empty_department_skips_user_lookup() {
    let graphql = MockGraphql::new();
    graphql.on("GetUserIdsInDepartment", json!({ "_UserDepartments": [] }));
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/department/3/users")
        .cookie(admin_cookie())
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"], json!([]));
    assert_eq!(graphql.call_count("GetUsersByIds"), 0);
}

#[actix_rt::test]
async fn test_add_users_skips_existing_members() {
    let graphql = MockGraphql::new();
    with_membership(&graphql);
    graphql
        .on(
            "CheckExistingMembers",
            json!({ "_UserDepartments": [{ "A": 5 }] }),
        )
        .on(
            "AddUsersToDepartment",
            json!({ "insert__UserDepartments": { "affected_rows": 1 } }),
        );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/3/add-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": [5, "6", 6] }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["data"]["added"], 1);
    assert_eq!(resp.body["data"]["skipped"], 1);
    assert_eq!(
        resp.body["data"]["usersInDepartment"],
        json!([member(5), member(6)])
    );
    assert_eq!(resp.body["data"]["usersNotInDepartment"], json!([member(7)]));

    let check = &graphql.calls_to("CheckExistingMembers")[0];
    assert_eq!(check.variables["userIds"], json!([5, 6]));
    let add = &graphql.calls_to("AddUsersToDepartment")[0];
    assert_eq!(add.variables["objects"], json!([{ "A": 6, "B": 3 }]));
}

#[actix_rt::test]
async fn test_add_users_errors() {
    let graphql = MockGraphql::new();
    with_membership(&graphql);
    graphql.on(
        "CheckExistingMembers",
        json!({ "_UserDepartments": [{ "A": 5 }, { "A": 6 }] }),
    );
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/3/add-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": [] }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "User IDs are required");

    let req = test::TestRequest::post()
        .uri("/api/department/3/add-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": ["a", 0] }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "Invalid user IDs");

    let req = test::TestRequest::post()
        .uri("/api/department/3/add-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": [5, 6] }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"], "All users are already in this department");
    assert_eq!(graphql.call_count("AddUsersToDepartment"), 0);
}

#[actix_rt::test]
async fn test_add_users_to_missing_department() {
    let graphql = MockGraphql::new();
    graphql.on("GetDepartmentById", json!({ "Department": [] }));
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/99/add-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": [5] }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"], "Department not found");
    assert_eq!(graphql.call_count("CheckExistingMembers"), 0);
}

#[actix_rt::test]
async fn test_remove_users() {
    let graphql = MockGraphql::new();
    with_membership(&graphql);
    graphql.on_fn("RemoveUserFromDepartment", |vars| {
        let affected = if vars["userId"] == 5 { 1 } else { 0 };
        Ok(json!({ "delete__UserDepartments": { "affected_rows": affected } }))
    });
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/department/3/remove-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": [5, 9] }))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["removed"], 1);
    assert_eq!(resp.body["data"]["failed"], 0);
    assert!(resp.body["data"]["usersInDepartment"].is_array());
    assert_eq!(graphql.call_count("RemoveUserFromDepartment"), 2);

    let req = test::TestRequest::post()
        .uri("/api/department/3/remove-users")
        .cookie(admin_cookie())
        .set_json(json!({ "userIds": [9] }))
        .to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.body["error"],
        "No users were removed. They may not exist in this department."
    );
}

#[actix_rt::test]
async fn test_department_routes_reject_user_role() {
    let graphql = MockGraphql::new();
    with_membership(&graphql);
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/department/3/users")
        .cookie(member_cookie())
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert!(graphql.calls().is_empty());
}
