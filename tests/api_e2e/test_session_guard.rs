//! E2E tests: session guard redirects, role checks and transparent refresh.

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test;
use course_admin_lib::auth::{ACCESS_COOKIE, REFRESH_COOKIE, create_access_token};
use course_admin_lib::config::SessionSettings;
use secrecy::SecretString;
use serde_json::json;

use super::mock_graphql::MockGraphql;
use super::test_helpers::*;

fn empty_user_list(graphql: &MockGraphql) {
    graphql.on("GetAllUsers", json!({ "User": [] }));
}

/// Access token signed with a secret the server does not know.
fn foreign_access_cookie() -> Cookie<'static> {
    let settings = SessionSettings {
        jwt_secret: SecretString::from("someone-elses-secret"),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 3600,
        secure_cookies: false,
    };
    let (token, _) =
        create_access_token(&public_user(ADMIN_ID, "SYSTEM_ADMIN"), &settings).unwrap();
    Cookie::new(ACCESS_COOKIE, token)
}

#[actix_rt::test]
async fn test_health_is_public() {
    let graphql = MockGraphql::new();
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["status"], "healthy");
    assert!(graphql.calls().is_empty());
}

#[actix_rt::test]
async fn test_ready_reflects_backend() {
    let graphql = MockGraphql::new();
    graphql.on("Ping", json!({ "__typename": "query_root" }));
    let app = create_app(graphql).await;

    let req = test::TestRequest::get().uri("/api/ready").to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["graphql"], "connected");

    let graphql = MockGraphql::new();
    graphql.fail("Ping", "connection refused");
    let app = create_app(graphql).await;

    let req = test::TestRequest::get().uri("/api/ready").to_request();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.body["code"], "NOT_READY");
}

#[actix_rt::test]
async fn test_anonymous_api_request_is_unauthorized() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get().uri("/api/users/get-all").to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["success"], false);
    assert_eq!(resp.body["code"], "UNAUTHORIZED");
    assert_eq!(graphql.call_count("GetAllUsers"), 0);
}

#[actix_rt::test]
async fn test_anonymous_page_request_redirects_to_login() {
    let app = create_app(MockGraphql::new()).await;

    let req = test::TestRequest::get().uri("/courses").to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), Some("/auth/login"));
}

#[actix_rt::test]
async fn test_signed_in_user_is_sent_away_from_login_page() {
    let app = create_app(MockGraphql::new()).await;

    let req = test::TestRequest::get()
        .uri("/auth/login")
        .cookie(member_cookie())
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), Some("/"));
}

#[actix_rt::test]
async fn test_user_role_is_kept_out_of_management_api() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(member_cookie())
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.body["error"], "Insufficient permissions");
    assert_eq!(graphql.call_count("GetAllUsers"), 0);

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(dept_admin_cookie())
        .to_request();
    assert_eq!(send(&app, req).await.status, StatusCode::OK);
}

#[actix_rt::test]
async fn test_refresh_cookie_alone_transparently_restores_session() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    with_refresh_store(&graphql, public_user(ADMIN_ID, "SYSTEM_ADMIN"), "guard-token");
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(refresh_cookie("guard-token"))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["message"], "Get all users successfully");
    assert_eq!(graphql.call_count("RotateRefreshToken"), 1);
    assert_eq!(graphql.call_count("GetAllUsers"), 1);

    let access = resp.cookie(ACCESS_COOKIE).expect("new access cookie");
    let refresh = resp.cookie(REFRESH_COOKIE).expect("new refresh cookie");
    assert!(!access.value().is_empty());
    assert_ne!(refresh.value(), "guard-token");
}

#[actix_rt::test]
async fn test_invalid_access_token_falls_back_to_refresh() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    with_refresh_store(&graphql, public_user(ADMIN_ID, "SYSTEM_ADMIN"), "fallback-token");
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(foreign_access_cookie())
        .cookie(refresh_cookie("fallback-token"))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(graphql.call_count("RotateRefreshToken"), 1);
    assert!(resp.cookie(REFRESH_COOKIE).is_some());
}

#[actix_rt::test]
async fn test_valid_access_token_skips_refresh() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    with_refresh_store(&graphql, public_user(ADMIN_ID, "SYSTEM_ADMIN"), "unused-token");
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(admin_cookie())
        .cookie(refresh_cookie("unused-token"))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(graphql.call_count("FindUserByRefreshToken"), 0);
    assert!(resp.cookie(REFRESH_COOKIE).is_none());
}

#[actix_rt::test]
async fn test_failed_transparent_refresh_is_unauthorized() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    with_refresh_store(&graphql, public_user(ADMIN_ID, "SYSTEM_ADMIN"), "current-token");
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(refresh_cookie("stale-token"))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(graphql.call_count("RotateRefreshToken"), 0);
    assert!(resp.cookie(ACCESS_COOKIE).is_none());
}

#[actix_rt::test]
async fn test_public_routes_never_refresh() {
    let graphql = MockGraphql::new();
    with_refresh_store(&graphql, public_user(ADMIN_ID, "SYSTEM_ADMIN"), "public-token");
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/health")
        .cookie(refresh_cookie("public-token"))
        .to_request();
    let resp = send(&app, req).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(graphql.calls().is_empty());
    assert!(resp.cookie(REFRESH_COOKIE).is_none());
}

#[actix_rt::test]
async fn test_refreshed_user_role_is_still_checked() {
    let graphql = MockGraphql::new();
    empty_user_list(&graphql);
    with_refresh_store(&graphql, public_user(MEMBER_ID, "USER"), "member-token");
    let app = create_app(graphql.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/users/get-all")
        .cookie(refresh_cookie("member-token"))
        .to_request();
    let resp = send(&app, req).await;

    // Rotation happened, so the new cookies ride along with the 403
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(graphql.call_count("RotateRefreshToken"), 1);
    assert!(resp.cookie(REFRESH_COOKIE).is_some());
    assert_eq!(graphql.call_count("GetAllUsers"), 0);
}
