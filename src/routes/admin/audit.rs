// ABOUTME: GET /api/admin/audit — the tamper-evident audit chain, newest first (§4.4, §4.8)

use axum::extract::State;
use axum::Json;

use crate::errors::AppResult;
use crate::middleware::AdminIdentity;
use crate::model::AuditEntry;
use crate::state::AppState;

/// `GET /api/admin/audit`. Returns entries newest-first; the store keeps
/// them in chain (ascending id) order internally.
///
/// # Errors
/// Returns `AppError::Internal` if the audit log cannot be read.
pub async fn list(State(state): State<AppState>, _admin: AdminIdentity) -> AppResult<Json<Vec<AuditEntry>>> {
    let mut entries = state.store.list_audit().await?;
    entries.reverse();
    Ok(Json(entries))
}
