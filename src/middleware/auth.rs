// ABOUTME: Bearer auth resolution order: admin token, then session hash-scan (§4.8)
// ABOUTME: Rate-limiter lockout is checked first and overrides every other error, per §7

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use std::net::SocketAddr;

use crate::crypto::verify_token;
use crate::errors::AppError;
use crate::model::{AuditAction, User};
use crate::state::AppState;

/// The caller's resolved identity for the current request.
pub enum Identity {
    /// The caller presented the admin bearer token.
    Admin,
    /// The caller presented a valid, unexpired session token.
    User(User),
}

impl Identity {
    /// The user record behind this identity, if any (`Admin` has none).
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Admin => None,
            Self::User(user) => Some(user),
        }
    }

    /// The actor name recorded on audit entries produced by this request.
    #[must_use]
    pub fn audit_name(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User(user) => &user.name,
        }
    }
}

fn client_ip(parts: &Parts) -> String {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The caller's IP address, for endpoints (like `/api/join`) that rate-limit
/// and audit without requiring a bearer token.
pub struct ClientIp(pub String);

impl<S: Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(parts)))
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ip = client_ip(parts);
        if state.rate_limiter.is_locked_out(&ip) {
            return Err(AppError::rate_limited("too many failed attempts; try again later"));
        }

        let TypedHeader(Authorization(bearer)) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized("missing or malformed Authorization header"))?;
        let token = bearer.token();

        if verify_token(token, &state.admin_token_hash) {
            state.rate_limiter.record_success(&ip);
            let _ = state
                .store
                .append_audit("admin", AuditAction::AdminLogin, "admin bearer token accepted", &ip)
                .await;
            return Ok(Self::Admin);
        }

        if let Some(session) = state.store.get_session_by_token(token).await? {
            if let Some(user) = state.store.get_user(&session.user_name).await? {
                state.store.touch_session(&session.token_hash).await?;
                state.rate_limiter.record_success(&ip);
                return Ok(Self::User(user));
            }
        }

        state.rate_limiter.record_failure(&ip);
        let _ = state
            .store
            .append_audit("unknown", AuditAction::AuthFailure, "bearer token did not match admin or any session", &ip)
            .await;
        Err(AppError::unauthorized("invalid or expired bearer token"))
    }
}

/// A resolved identity known to be the admin; use in admin-only handlers.
pub struct AdminIdentity;

impl FromRequestParts<AppState> for AdminIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await? {
            Identity::Admin => Ok(Self),
            Identity::User(_) => Err(AppError::forbidden("admin privileges required")),
        }
    }
}

/// A resolved identity known to be a joined user; use in user-session handlers.
pub struct UserIdentity(pub User);

impl FromRequestParts<AppState> for UserIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await? {
            Identity::User(user) => Ok(Self(user)),
            Identity::Admin => Err(AppError::forbidden("this endpoint requires a user session, not the admin token")),
        }
    }
}
