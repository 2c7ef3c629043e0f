// ABOUTME: POST /api/cert/renew mints a fresh certificate bound to the caller's current grants (§4.2, §8)

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{get_auth, post_json, post_json_auth, spawn_app, ADMIN_TOKEN};

async fn join_as_dev(router: &axum::Router, name: &str) -> String {
    let create = post_json_auth(
        router,
        "/api/admin/users",
        &json!({"name": name, "email": format!("{name}@example.com"), "role": "dev"}),
        ADMIN_TOKEN,
    )
    .await;
    let invite_token = create.json::<Value>()["invite_token"].as_str().unwrap().to_string();
    let join = post_json(router, "/api/join", &json!({"invite_token": invite_token})).await;
    join.json::<Value>()["session_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn renewal_reflects_grants_made_after_join() {
    let app = spawn_app().await;
    let session_token = join_as_dev(&app.router, "frank").await;

    let info_before = get_auth(&app.router, "/api/cert/info", &session_token).await;
    assert_eq!(info_before.status, StatusCode::OK);
    assert_eq!(info_before.json::<Value>()["principals"], json!(["frank"]));

    post_json_auth(&app.router, "/api/admin/projects", &json!({"name": "payments"}), ADMIN_TOKEN).await;
    post_json_auth(
        &app.router,
        "/api/admin/environments",
        &json!({
            "project": "payments", "name": "prod", "host": "pay.internal",
            "port": 22, "deploy_user": "payments-deploy", "deploy_key": "k",
        }),
        ADMIN_TOKEN,
    )
    .await;
    post_json_auth(
        &app.router,
        "/api/admin/users/frank/access",
        &json!({"project": "payments"}),
        ADMIN_TOKEN,
    )
    .await;

    let renewed = post_json_auth(&app.router, "/api/cert/renew", &json!({}), &session_token).await;
    assert_eq!(renewed.status, StatusCode::OK);
    let body: Value = renewed.json();
    assert_eq!(body["principals"], json!(["payments-deploy", "frank"]));
    assert!(body["certificate"]
        .as_str()
        .unwrap()
        .starts_with("ssh-ed25519-cert-v01@openssh.com "));
    let valid_after: chrono::DateTime<chrono::Utc> = body["valid_after"].as_str().unwrap().parse().unwrap();
    let valid_before: chrono::DateTime<chrono::Utc> = body["valid_before"].as_str().unwrap().parse().unwrap();
    assert!(valid_before > valid_after);
}

#[tokio::test]
async fn cert_renew_requires_a_user_session_not_the_admin_token() {
    let app = spawn_app().await;
    let response = post_json_auth(&app.router, "/api/cert/renew", &json!({}), ADMIN_TOKEN).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
