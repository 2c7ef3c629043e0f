// ABOUTME: GET /api/me — the caller's own profile (§4.8)

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::errors::AppResult;
use crate::middleware::UserIdentity;
use crate::state::AppState;

/// Response body for `GET /api/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// The caller's user name.
    pub name: String,
    /// The caller's email.
    pub email: String,
    /// The caller's role.
    pub role: crate::model::Role,
    /// Project names the caller currently holds a grant for.
    pub projects: Vec<String>,
    /// Whether MFA has been confirmed for this account.
    pub mfa_enabled: bool,
    /// The caller's OpenSSH public key.
    pub public_key: Option<String>,
}

/// `GET /api/me`.
///
/// # Errors
/// Returns `AppError::Internal` if the grant list cannot be read.
pub async fn me(State(state): State<AppState>, UserIdentity(user): UserIdentity) -> AppResult<Json<MeResponse>> {
    let projects = state.store.granted_projects(&user.name).await?;
    Ok(Json(MeResponse {
        name: user.name,
        email: user.email,
        role: user.role,
        projects,
        mfa_enabled: user.mfa_enabled,
        public_key: user.public_key,
    }))
}
