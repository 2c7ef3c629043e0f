// ABOUTME: Shared test harness — builds a full router over an in-memory store
// ABOUTME: Mirrors the production Router assembled in lifecycle::start, minus the TCP listener

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde::Serialize;
use tower::ServiceExt;

use keyforge::config::{LogFormat, ServerConfig};
use keyforge::crypto::{hash_token, MasterKey};
use keyforge::notifier::NoopNotifier;
use keyforge::ratelimit::RateLimiter;
use keyforge::ssh::CertificateAuthority;
use keyforge::state::AppState;
use keyforge::store::Store;

/// Raw admin bearer token fixed across tests; only its Argon2id hash is held by `AppState`.
pub const ADMIN_TOKEN: &str = "test-only-admin-token-do-not-use";

/// A running router plus the fixtures needed to drive it.
pub struct TestApp {
    pub router: Router,
}

/// Assemble an `AppState` over a fresh in-memory store and build the router,
/// exactly as `routes::build` does in `lifecycle::start`.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_ca(true).await
}

/// Same as [`spawn_app`], but with the CA disabled (key-only mode, §4.2).
pub async fn spawn_app_ca_disabled() -> TestApp {
    spawn_app_with_ca(false).await
}

async fn spawn_app_with_ca(ca_enabled: bool) -> TestApp {
    let store = Store::connect(std::path::Path::new(":memory:"))
        .await
        .expect("in-memory store should always connect");

    let master_key = MasterKey::from_hex(&"42".repeat(32)).expect("fixed test key is valid hex");
    let cert_validity = Duration::hours(24);
    let (mut ca, encrypted) =
        CertificateAuthority::generate(&master_key, cert_validity).expect("CA key generation should not fail");
    if !ca_enabled {
        ca = CertificateAuthority::load(&master_key, &encrypted, ca.public_key().to_string(), cert_validity, false)
            .expect("reloading the just-generated key should not fail");
    }

    let config = ServerConfig {
        data_dir: std::path::PathBuf::from("./unused-in-tests"),
        http_addr: "127.0.0.1:0".to_string(),
        cert_validity,
        session_ttl: Duration::days(30),
        invite_ttl: Duration::days(7),
        smtp: None,
        rate_limit_max_attempts: 10,
        rate_limit_window: StdDuration::from_secs(60),
        rate_limit_lockout: StdDuration::from_secs(900),
        log_format: LogFormat::Pretty,
    };

    let admin_token_hash: Arc<str> =
        Arc::from(hash_token(ADMIN_TOKEN).expect("hashing the fixed admin token should not fail").as_str());

    let state = AppState {
        store,
        ca: Arc::new(ca),
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max_attempts,
            config.rate_limit_window,
            config.rate_limit_lockout,
        )),
        notifier: Arc::new(NoopNotifier),
        config: Arc::new(config),
        master_key: Arc::new(master_key),
        admin_token_hash,
    };

    // tests never exercise Strict-Transport-Security, so tls_enabled is moot.
    let router = keyforge::routes::build(state, false);
    TestApp { router }
}

/// Minimal response wrapper, read eagerly so callers can assert on status and body.
pub struct TestResponse {
    pub status: StatusCode,
    body: Vec<u8>,
}

impl TestResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("response body should be valid JSON")
    }
}

/// Send a request with no body and no auth header.
pub async fn get(router: &Router, uri: &str) -> TestResponse {
    request(router, "GET", uri, None::<()>, None).await
}

/// Send a request with no body, authenticated with `token`.
pub async fn get_auth(router: &Router, uri: &str, token: &str) -> TestResponse {
    request(router, "GET", uri, None::<()>, Some(token)).await
}

/// Send a JSON POST with no auth header (e.g. `/api/join`).
pub async fn post_json<T: Serialize>(router: &Router, uri: &str, body: &T) -> TestResponse {
    request(router, "POST", uri, Some(body), None).await
}

/// Send a JSON POST authenticated with `token`.
pub async fn post_json_auth<T: Serialize>(router: &Router, uri: &str, body: &T, token: &str) -> TestResponse {
    request(router, "POST", uri, Some(body), Some(token)).await
}

/// Send a DELETE with a JSON body, authenticated with `token`.
pub async fn delete_json_auth<T: Serialize>(router: &Router, uri: &str, body: &T, token: &str) -> TestResponse {
    request(router, "DELETE", uri, Some(body), Some(token)).await
}

/// Send a bodyless DELETE, authenticated with `token`.
pub async fn delete_auth(router: &Router, uri: &str, token: &str) -> TestResponse {
    request(router, "DELETE", uri, None::<()>, Some(token)).await
}

async fn request<T: Serialize>(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<&T>,
    token: Option<&str>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let payload = body.map(|b| serde_json::to_vec(b).expect("test request body should serialize")).unwrap_or_default();
    let request = builder.body(Body::from(payload)).expect("test request should build");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should always produce a response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable")
        .to_vec();
    TestResponse { status, body }
}
