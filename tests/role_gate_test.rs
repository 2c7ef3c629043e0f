// ABOUTME: Admin-only endpoints reject user sessions, and missing/invalid bearer tokens are unauthorized (§4.8)

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{get, get_auth, post_json, post_json_auth, spawn_app, ADMIN_TOKEN};

async fn join_as_readonly(router: &axum::Router, name: &str) -> String {
    let create = post_json_auth(
        router,
        "/api/admin/users",
        &json!({"name": name, "email": format!("{name}@example.com"), "role": "readonly"}),
        ADMIN_TOKEN,
    )
    .await;
    let invite_token = create.json::<Value>()["invite_token"].as_str().unwrap().to_string();
    let join = post_json(router, "/api/join", &json!({"invite_token": invite_token})).await;
    join.json::<Value>()["session_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn a_user_session_cannot_reach_admin_endpoints() {
    let app = spawn_app().await;
    let session_token = join_as_readonly(&app.router, "grace").await;

    let response = get_auth(&app.router, "/api/admin/users", &session_token).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = post_json_auth(
        &app.router,
        "/api/admin/projects",
        &json!({"name": "x"}),
        &session_token,
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let app = spawn_app().await;
    let response = get(&app.router, "/api/admin/users").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = get(&app.router, "/api/me").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_bearer_token_is_unauthorized() {
    let app = spawn_app().await;
    let response = get_auth(&app.router, "/api/admin/users", "not-a-real-token").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let error: Value = response.json();
    assert_eq!(error["code"], "unauthorized");
}

#[tokio::test]
async fn health_check_requires_no_authentication() {
    let app = spawn_app().await;
    let response = get(&app.router, "/health").await;
    assert_eq!(response.status, StatusCode::OK);
}
