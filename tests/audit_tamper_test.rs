// ABOUTME: The audit log's hash chain detects tampering with any past entry (§4.4, §8)
// ABOUTME: Every admin-token request logs ADMIN_LOGIN ahead of the action it authorizes

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use keyforge::audit::{verify_chain, VerifyOutcome};
use keyforge::model::{AuditAction, AuditEntry};

use common::{post_json_auth, spawn_app, ADMIN_TOKEN};

async fn fetch_audit_entries(router: &axum::Router) -> Vec<AuditEntry> {
    let response = common::get_auth(router, "/api/admin/audit", ADMIN_TOKEN).await;
    assert_eq!(response.status, StatusCode::OK);
    let body: Value = response.json();
    body.as_array()
        .unwrap()
        .iter()
        .map(|entry| AuditEntry {
            id: entry["id"].as_i64().unwrap(),
            timestamp: entry["timestamp"].as_str().unwrap().parse().unwrap(),
            user_name: entry["user_name"].as_str().unwrap().to_string(),
            action: serde_json::from_value(entry["action"].clone()).unwrap(),
            details: entry["details"].as_str().unwrap().to_string(),
            ip_address: entry["ip_address"].as_str().unwrap().to_string(),
            prev_hash: entry["prev_hash"].as_str().unwrap().to_string(),
            hash: entry["hash"].as_str().unwrap().to_string(),
        })
        .collect()
}

async fn seed_two_projects(router: &axum::Router) {
    for name in ["alpha", "beta"] {
        let response = post_json_auth(
            router,
            "/api/admin/projects",
            &json!({"name": name, "description": ""}),
            ADMIN_TOKEN,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
    }
}

#[tokio::test]
async fn admin_audit_lists_newest_first_and_verifies_clean() {
    let app = spawn_app().await;
    seed_two_projects(&app.router).await;

    let mut entries = fetch_audit_entries(&app.router).await;
    // ADMIN_LOGIN precedes each of the two PROJECT_CREATE actions, plus one
    // more ADMIN_LOGIN for the bearer token presented on this very fetch.
    assert_eq!(entries.len(), 5);
    // The endpoint presents newest first; chain verification recomputes
    // forward from the oldest entry, so restore append order before checking.
    entries.reverse();
    assert_eq!(verify_chain(&entries), VerifyOutcome::Ok);

    assert_eq!(entries[0].action, AuditAction::AdminLogin);
    assert_eq!(entries[1].action, AuditAction::ProjectCreate);
    assert!(entries[1].details.contains("alpha"));
    assert_eq!(entries[3].action, AuditAction::ProjectCreate);
    assert!(entries[3].details.contains("beta"));
    assert_eq!(entries[4].action, AuditAction::AdminLogin);
}

#[tokio::test]
async fn tampering_with_an_earlier_entry_is_detected() {
    let app = spawn_app().await;
    seed_two_projects(&app.router).await;

    let mut entries = fetch_audit_entries(&app.router).await;
    entries.reverse();
    assert_eq!(verify_chain(&entries), VerifyOutcome::Ok);

    let tampered_index = 1; // the PROJECT_CREATE for "alpha"
    entries[tampered_index].details = "attacker-rewritten description".to_string();

    match verify_chain(&entries) {
        VerifyOutcome::Tampered { index } => assert_eq!(index, tampered_index),
        VerifyOutcome::Ok => panic!("tampering with a stored entry must be detected"),
    }
}
