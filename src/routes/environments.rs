// ABOUTME: GET /api/environments — environments visible under the caller's current grants (§4.6, §4.8)

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::authz::visible_environments;
use crate::errors::AppResult;
use crate::middleware::UserIdentity;
use crate::model::Role;
use crate::state::AppState;

/// One environment as exposed to a caller; the encrypted deploy key is never included.
#[derive(Debug, Serialize)]
pub struct EnvironmentView {
    /// Owning project.
    pub project: String,
    /// Environment name.
    pub name: String,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Deploy user certificates would authorize here.
    pub deploy_user: String,
}

/// `GET /api/environments`.
///
/// # Errors
/// Returns `AppError::Internal` if the environment or grant list cannot be read.
pub async fn list_environments(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
) -> AppResult<Json<Vec<EnvironmentView>>> {
    let granted = if user.role == Role::Admin {
        Vec::new()
    } else {
        state.store.granted_projects(&user.name).await?
    };
    let all_environments = state.store.list_environments(None).await?;
    let visible = visible_environments(user.role, &granted, &all_environments);

    Ok(Json(
        visible
            .into_iter()
            .map(|env| EnvironmentView {
                project: env.project_name.clone(),
                name: env.name.clone(),
                host: env.host.clone(),
                port: env.port,
                deploy_user: env.deploy_user.clone(),
            })
            .collect(),
    ))
}
