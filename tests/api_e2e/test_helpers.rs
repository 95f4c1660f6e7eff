//! Shared test helpers for API E2E tests.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::HeaderMap;
use actix_web::{App, test, web};
use course_admin_lib::api;
use course_admin_lib::auth::{ACCESS_COOKIE, REFRESH_COOKIE, create_access_token, hash_password};
use course_admin_lib::config::{
    Config, Environment, GraphqlSettings, SessionSettings, StorageSettings, defaults,
};
use course_admin_lib::db::{DataLayer, sessions};
use course_admin_lib::middleware::SessionGuard;
use course_admin_lib::models::PublicUser;
use course_admin_lib::services::ObjectStore;
use secrecy::SecretString;
use serde_json::{Value, json};

use super::mock_graphql::MockGraphql;
use super::mock_storage::MockStorage;

pub const TEST_JWT_SECRET: &str = "api-e2e-jwt-secret";
pub const TEST_PUBLIC_URL: &str = "https://cdn.example.com";
pub const TEST_CLIENT_URL: &str = "http://localhost:4001";

pub const ADMIN_ID: i64 = 1;
pub const DEPT_ADMIN_ID: i64 = 2;
pub const MEMBER_ID: i64 = 3;

/// Configuration used by every test app.
pub fn test_config() -> Config {
    Config {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 4001,
        static_dir: None,
        client_url: TEST_CLIENT_URL.to_string(),
        graphql: GraphqlSettings {
            url: defaults::DEV_HASURA_URL.to_string(),
            admin_secret: SecretString::from("unused"),
            default_role: None,
        },
        session: SessionSettings {
            jwt_secret: SecretString::from(TEST_JWT_SECRET),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 3600,
            secure_cookies: false,
        },
        storage: StorageSettings {
            endpoint: None,
            bucket: "avatars".to_string(),
            region: defaults::S3_REGION.to_string(),
            access_key: "unused".to_string(),
            secret_key: SecretString::from("unused"),
            public_url: TEST_PUBLIC_URL.to_string(),
        },
    }
}

/// Create a test app with the session guard and every API route.
pub async fn create_test_app(
    graphql: Arc<MockGraphql>,
    storage: Arc<MockStorage>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    let store: Arc<dyn ObjectStore> = storage;

    test::init_service(
        App::new()
            .wrap(SessionGuard)
            .app_data(web::Data::new(test_config()))
            .app_data(web::Data::new(DataLayer::new(graphql)))
            .app_data(web::Data::new(store))
            .app_data(api::json_config())
            .app_data(api::query_config())
            .service(web::scope("/api").configure(api::configure_api)),
    )
    .await
}

/// Create a test app with a fresh storage double.
pub async fn create_app(
    graphql: Arc<MockGraphql>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    create_test_app(graphql, MockStorage::new()).await
}

pub fn public_user(id: i64, role: &str) -> PublicUser {
    PublicUser {
        id,
        email: format!("user{}@example.com", id),
        name: Some(format!("User {}", id)),
        role: role.to_string(),
        avatar: None,
    }
}

/// A signed access token cookie for a user with `role`.
pub fn access_cookie(id: i64, role: &str) -> Cookie<'static> {
    let (token, _) = create_access_token(&public_user(id, role), &test_config().session)
        .expect("sign token");
    Cookie::new(ACCESS_COOKIE, token)
}

pub fn admin_cookie() -> Cookie<'static> {
    access_cookie(ADMIN_ID, "SYSTEM_ADMIN")
}

pub fn dept_admin_cookie() -> Cookie<'static> {
    access_cookie(DEPT_ADMIN_ID, "DEPT_ADMIN")
}

pub fn member_cookie() -> Cookie<'static> {
    access_cookie(MEMBER_ID, "USER")
}

pub fn refresh_cookie(value: &str) -> Cookie<'static> {
    Cookie::new(REFRESH_COOKIE, value.to_string())
}

/// `User` row as returned for session lookups.
pub fn session_row(user: &PublicUser) -> Value {
    json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role,
        "avatar": user.avatar,
    })
}

/// `User` row including an Argon2 hash of `password`.
pub fn credential_row(user: &PublicUser, password: &str) -> Value {
    let mut row = session_row(user);
    row["password"] = json!(hash_password(password).expect("hash password"));
    row
}

/// Full user profile row as stored by the backend.
pub fn profile_row(id: i64, email: &str) -> Value {
    json!({
        "id": id,
        "name": "Ann",
        "email": email,
        "phone": null,
        "gender": "2",
        "avatar": null,
        "address": null,
        "dateofbirth": "1990-01-02",
        "githubId": null,
        "googleId": null,
        "createdAt": "2025-01-01T00:00:00Z",
        "provider": "EMAIL_PASSWORD",
        "role": "USER",
        "updatedAt": "2025-01-01T00:00:00Z",
        "deletedAt": null
    })
}

/// Backend holding one user with a single stored refresh token hash.
///
/// `FindUserByRefreshToken` and `RotateRefreshToken` behave like the real conditional
/// query and compare-and-set mutation.
pub fn with_refresh_store(graphql: &MockGraphql, user: PublicUser, raw_token: &str) {
    let stored = Arc::new(std::sync::Mutex::new(Some(sessions::hash_token(raw_token))));

    let lookup = Arc::clone(&stored);
    let row = session_row(&user);
    graphql.on_fn("FindUserByRefreshToken", move |vars| {
        let current = lookup.lock().unwrap().clone();
        let matches = current.as_deref() == vars["tokenHash"].as_str();
        Ok(json!({ "User": if matches { vec![row.clone()] } else { vec![] } }))
    });

    let cas = Arc::clone(&stored);
    graphql.on_fn("RotateRefreshToken", move |vars| {
        let mut current = cas.lock().unwrap();
        if current.as_deref() == vars["oldHash"].as_str() {
            *current = vars["newHash"].as_str().map(str::to_string);
            Ok(json!({ "update_User": { "affected_rows": 1 } }))
        } else {
            Ok(json!({ "update_User": { "affected_rows": 0 } }))
        }
    });
}

/// Status, headers, cookies and JSON body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub cookies: Vec<Cookie<'static>>,
    pub body: Value,
}

impl TestResponse {
    pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
        self.cookies.iter().find(|c| c.name() == name)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(actix_web::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Send a request and collect the response.
pub async fn send<S, B>(app: &S, req: actix_http::Request) -> TestResponse
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let headers = resp.headers().clone();
    let cookies = resp
        .response()
        .cookies()
        .map(|c| c.into_owned())
        .collect();

    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        cookies,
        body,
    }
}
