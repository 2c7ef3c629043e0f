// ABOUTME: An invite token can only ever redeem once (§4.2, §8)

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{post_json, post_json_auth, spawn_app, ADMIN_TOKEN};

#[tokio::test]
async fn second_redemption_of_the_same_token_is_rejected() {
    let app = spawn_app().await;

    let create = post_json_auth(
        &app.router,
        "/api/admin/users",
        &json!({"name": "dave", "email": "dave@example.com", "role": "dev"}),
        ADMIN_TOKEN,
    )
    .await;
    let invite_token = create.json::<Value>()["invite_token"].as_str().unwrap().to_string();

    let first = post_json(&app.router, "/api/join", &json!({"invite_token": invite_token})).await;
    assert_eq!(first.status, StatusCode::OK);
    let first_session = first.json::<Value>()["session_token"].as_str().unwrap().to_string();

    let second = post_json(&app.router, "/api/join", &json!({"invite_token": invite_token})).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    let error: Value = second.json();
    assert_eq!(error["code"], "not_found");

    // The session minted on the first redemption is unaffected by the
    // rejected second attempt.
    let me = common::get_auth(&app.router, "/api/me", &first_session).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json::<Value>()["name"], "dave");
}

#[tokio::test]
async fn redeeming_another_users_unrelated_invite_does_not_interfere() {
    let app = spawn_app().await;

    let dave = post_json_auth(
        &app.router,
        "/api/admin/users",
        &json!({"name": "dave", "email": "dave@example.com", "role": "dev"}),
        ADMIN_TOKEN,
    )
    .await;
    let dave_token = dave.json::<Value>()["invite_token"].as_str().unwrap().to_string();

    let erin = post_json_auth(
        &app.router,
        "/api/admin/users",
        &json!({"name": "erin", "email": "erin@example.com", "role": "dev"}),
        ADMIN_TOKEN,
    )
    .await;
    let erin_token = erin.json::<Value>()["invite_token"].as_str().unwrap().to_string();

    let dave_join = post_json(&app.router, "/api/join", &json!({"invite_token": dave_token})).await;
    assert_eq!(dave_join.status, StatusCode::OK);

    // Erin's still-unredeemed invite is unaffected by Dave's join.
    let erin_join = post_json(&app.router, "/api/join", &json!({"invite_token": erin_token})).await;
    assert_eq!(erin_join.status, StatusCode::OK);
    assert_ne!(
        erin_join.json::<Value>()["session_token"],
        dave_join.json::<Value>()["session_token"]
    );
}
