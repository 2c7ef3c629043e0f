// ABOUTME: POST /api/cert/renew, GET /api/cert/info — certificate re-minting (§4.2, §4.8)

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::authz::{resolve_principals, visible_environments};
use crate::errors::{AppError, AppResult};
use crate::middleware::{ClientIp, UserIdentity};
use crate::model::{AuditAction, Role};
use crate::state::AppState;

async fn principals_for(state: &AppState, user: &crate::model::User) -> AppResult<Vec<String>> {
    let granted = if user.role == Role::Admin {
        Vec::new()
    } else {
        state.store.granted_projects(&user.name).await?
    };
    let all_environments = state.store.list_environments(None).await?;
    let visible = visible_environments(user.role, &granted, &all_environments);
    Ok(resolve_principals(&user.name, &visible))
}

/// Response body for `POST /api/cert/renew`.
#[derive(Debug, Serialize)]
pub struct RenewResponse {
    /// OpenSSH user certificate.
    pub certificate: String,
    /// Start of the validity window.
    pub valid_after: chrono::DateTime<chrono::Utc>,
    /// End of the validity window.
    pub valid_before: chrono::DateTime<chrono::Utc>,
    /// Principals burned into the certificate.
    pub principals: Vec<String>,
}

/// `POST /api/cert/renew`.
///
/// # Errors
/// Returns `AppError::Internal` if the CA is disabled or signing fails.
pub async fn renew(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
    ClientIp(ip): ClientIp,
) -> AppResult<Json<RenewResponse>> {
    let public_key = user
        .public_key
        .as_deref()
        .ok_or_else(|| AppError::internal("user has no public key on file"))?;
    let principals = principals_for(&state, &user).await?;
    let cert = state.ca.mint(public_key, &user.name, &principals)?;

    state
        .store
        .append_audit(
            &user.name,
            AuditAction::CertRenew,
            format!("serial {} principals {:?}", cert.serial, principals),
            &ip,
        )
        .await?;

    Ok(Json(RenewResponse {
        certificate: cert.certificate_openssh,
        valid_after: cert.valid_after,
        valid_before: cert.valid_before,
        principals,
    }))
}

/// Response body for `GET /api/cert/info`.
#[derive(Debug, Serialize)]
pub struct CertInfoResponse {
    /// Whether a renewal would currently succeed.
    pub would_issue: bool,
    /// Principals a renewal would burn into the certificate.
    pub principals: Vec<String>,
    /// Projected start of the validity window.
    pub valid_after: chrono::DateTime<chrono::Utc>,
    /// Projected end of the validity window.
    pub valid_before: chrono::DateTime<chrono::Utc>,
}

/// `GET /api/cert/info`.
///
/// # Errors
/// Returns `AppError::Internal` if the grant or environment list cannot be read.
pub async fn info(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
) -> AppResult<Json<CertInfoResponse>> {
    let principals = principals_for(&state, &user).await?;
    let info = state.ca.info(principals);
    Ok(Json(CertInfoResponse {
        would_issue: info.would_issue,
        principals: info.principals,
        valid_after: info.valid_after,
        valid_before: info.valid_before,
    }))
}
