//! Shared helpers for HTTP integration tests.
//!
//! Requests go straight to the router through `tower::ServiceExt::oneshot`,
//! without a TCP listener.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use millwright_api::auth::jwt::{generate_access_token, JwtConfig};
use millwright_api::config::ServerConfig;
use millwright_api::router::build_app_router;
use millwright_api::state::AppState;
use millwright_core::roles::Role;
use millwright_core::types::DbId;
use millwright_db::models::user::CreateUser;
use millwright_db::repositories::UserRepo;
use millwright_notify::NotificationDispatcher;
use sqlx::PgPool;
use tower::ServiceExt;

const TEST_SECRET: &str = "integration-test-secret-long-enough-for-hmac";

fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        notification_retention_days: 30,
        email_queue_capacity: 16,
        jwt: jwt_config(),
    }
}

/// Build the full application router over `pool`, with email disabled.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        dispatcher: NotificationDispatcher::new(pool, None),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

/// A seeded user and a bearer token for them.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: DbId,
    pub role: Role,
    pub token: String,
}

pub fn token_for(user_id: DbId, role: Role) -> String {
    generate_access_token(user_id, role, &jwt_config()).expect("token generation")
}

pub async fn create_user(pool: &PgPool, username: &str, role: Role) -> TestUser {
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: Some(format!("{username}@plant.test")),
            role,
        },
    )
    .await
    .expect("create user");
    TestUser {
        id: user.id,
        role,
        token: token_for(user.id, role),
    }
}

/// One user per role: manager, technician, repair, viewer.
pub struct Staff {
    pub manager: TestUser,
    pub technician: TestUser,
    pub repair: TestUser,
    pub viewer: TestUser,
}

pub async fn seed_staff(pool: &PgPool) -> Staff {
    Staff {
        manager: create_user(pool, "mgr", Role::Manager).await,
        technician: create_user(pool, "tech", Role::Technician).await,
        repair: create_user(pool, "fixer", Role::Repair).await,
        viewer: create_user(pool, "viewer", Role::ViewOnly).await,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// GET without credentials.
pub async fn get_anonymous(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a machine through the API as `manager` and return its id.
pub async fn create_machine(pool: &PgPool, manager: &TestUser, name: &str) -> DbId {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/machines",
        &manager.token,
        serde_json::json!({ "name": name, "serial_number": format!("SN-{name}") }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Open a case on `machine_id` as `user` and return the case JSON.
pub async fn open_case(
    pool: &PgPool,
    user: &TestUser,
    machine_id: DbId,
    title: &str,
) -> serde_json::Value {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/cases",
        &user.token,
        serde_json::json!({ "machine_id": machine_id, "title": title }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Current derived status of a machine, read through the API.
pub async fn machine_status(pool: &PgPool, user: &TestUser, machine_id: DbId) -> String {
    let response = get(
        build_test_app(pool.clone()),
        &format!("/api/v1/machines/{machine_id}"),
        &user.token,
    )
    .await;
    body_json(response).await["data"]["status"]
        .as_str()
        .unwrap()
        .to_string()
}
