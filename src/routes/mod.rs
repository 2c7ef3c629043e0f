// ABOUTME: HTTP surface assembly (§4.8) — wires every endpoint to its handler and applies middleware

//! The full `axum::Router`, assembled once in `lifecycle::start`.

use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Admin-only endpoints (users, invites, projects, environments, audit, CA status).
pub mod admin;
/// `GET /api/cert/info`, `POST /api/cert/renew`.
pub mod cert;
/// `GET /api/environments`.
pub mod environments;
/// `GET /health`.
pub mod health;
/// `POST /api/join`.
pub mod join;
/// `GET /api/me`.
pub mod me;
/// `GET`/`POST /api/mfa/setup`.
pub mod mfa;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the complete router over `state`. `tls_enabled` controls whether
/// `Strict-Transport-Security` is attached to responses.
#[must_use]
pub fn build(state: AppState, tls_enabled: bool) -> Router {
    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin::users::list).post(admin::users::create))
        .route("/api/admin/users/:name", get(admin::users::get).delete(admin::users::delete))
        .route("/api/admin/users/:name/access", post(admin::users::grant_access).delete(admin::users::revoke_access))
        .route("/api/admin/projects", get(admin::projects::list).post(admin::projects::create))
        .route("/api/admin/projects/:name", get(admin::projects::get).delete(admin::projects::delete))
        .route("/api/admin/environments", get(admin::environments::list).post(admin::environments::create))
        .route("/api/admin/environments/:project/:name", delete(admin::environments::delete))
        .route("/api/admin/audit", get(admin::audit::list))
        .route("/api/admin/ca", get(admin::ca::status));

    let user_routes = Router::new()
        .route("/api/me", get(me::me))
        .route("/api/environments", get(environments::list_environments))
        .route("/api/cert/renew", post(cert::renew))
        .route("/api/cert/info", get(cert::info))
        .route("/api/mfa/setup", get(mfa::setup_begin).post(mfa::setup_confirm));

    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api/join", post(join::join));

    Router::new()
        .merge(admin_routes)
        .merge(user_routes)
        .merge(public_routes)
        .layer(axum::middleware::from_fn(move |req, next| {
            crate::middleware::security_headers(tls_enabled, req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}
