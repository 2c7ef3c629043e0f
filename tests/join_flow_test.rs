// ABOUTME: End-to-end happy path — invite a user, redeem it, and use the resulting session

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use keyforge::ssh::keypair;

use common::{get_auth, post_json, post_json_auth, spawn_app, ADMIN_TOKEN};

#[tokio::test]
async fn invite_join_cert_and_me_round_trip() {
    let app = spawn_app().await;

    let create = post_json_auth(
        &app.router,
        "/api/admin/users",
        &json!({"name": "alice", "email": "alice@example.com", "role": "dev"}),
        ADMIN_TOKEN,
    )
    .await;
    assert_eq!(create.status, StatusCode::OK);
    let created: Value = create.json();
    let invite_token = created["invite_token"].as_str().unwrap().to_string();
    assert_eq!(created["user"]["name"], "alice");
    assert!(created["user"]["joined_at"].is_null());

    let key_pair = keypair::generate_ed25519().unwrap();
    let join = post_json(&app.router, "/api/join", &json!({"invite_token": invite_token})).await;
    assert_eq!(join.status, StatusCode::OK);
    let joined: Value = join.json();
    assert!(joined["session_token"].as_str().unwrap().len() > 10);
    assert_eq!(joined["ca_enabled"], true);
    assert!(joined["certificate"]
        .as_str()
        .unwrap()
        .starts_with("ssh-ed25519-cert-v01@openssh.com "));
    // The private key in the response is server-generated for this join, not
    // the one the test generated locally; the test key pair just confirms
    // the generator produces a distinct, well-formed key each call.
    assert!(key_pair.public_key_openssh.starts_with("ssh-ed25519 "));
    let session_token = joined["session_token"].as_str().unwrap().to_string();

    let joining_again = post_json(&app.router, "/api/join", &json!({"invite_token": invite_token})).await;
    assert_eq!(joining_again.status, StatusCode::NOT_FOUND);

    let me = get_auth(&app.router, "/api/me", &session_token).await;
    assert_eq!(me.status, StatusCode::OK);
    let me_body: Value = me.json();
    assert_eq!(me_body["name"], "alice");
    assert_eq!(me_body["role"], "dev");
    assert_eq!(me_body["mfa_enabled"], false);
    assert_eq!(me_body["projects"], json!([]));
}

#[tokio::test]
async fn join_with_unknown_token_is_not_found() {
    let app = spawn_app().await;
    let response = post_json(&app.router, "/api/join", &json!({"invite_token": "does-not-exist"})).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn join_with_ca_disabled_returns_no_certificate() {
    let app = common::spawn_app_ca_disabled().await;

    let create = post_json_auth(
        &app.router,
        "/api/admin/users",
        &json!({"name": "bob", "email": "bob@example.com", "role": "dev"}),
        ADMIN_TOKEN,
    )
    .await;
    let invite_token = create.json::<Value>()["invite_token"].as_str().unwrap().to_string();

    let join = post_json(&app.router, "/api/join", &json!({"invite_token": invite_token})).await;
    assert_eq!(join.status, StatusCode::OK);
    let body: Value = join.json();
    assert_eq!(body["ca_enabled"], false);
    assert!(body.get("certificate").is_none());
}
