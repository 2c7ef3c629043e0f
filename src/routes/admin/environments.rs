// ABOUTME: Admin environment CRUD endpoints (§4.3, §4.8)
// ABOUTME: Deploy keys arrive plaintext over TLS and are encrypted before the store ever sees them

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::middleware::{AdminIdentity, ClientIp};
use crate::state::AppState;
use crate::utils::validation::{validate_name, validate_port};

/// `GET /api/admin/environments`. Lists across every project.
///
/// # Errors
/// Returns `AppError::Internal` if the environment list cannot be read.
pub async fn list(State(state): State<AppState>, _admin: AdminIdentity) -> AppResult<Json<Vec<EnvironmentAdminView>>> {
    let environments = state.store.list_environments(None).await?;
    Ok(Json(environments.into_iter().map(EnvironmentAdminView::from).collect()))
}

/// An environment as shown to an admin. Unlike the user-facing view, the
/// deploy key stays encrypted-at-rest and is never included here either.
#[derive(Debug, Serialize)]
pub struct EnvironmentAdminView {
    /// Owning project.
    pub project: String,
    /// Environment name, unique within the project.
    pub name: String,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// Deploy account name.
    pub deploy_user: String,
}

impl From<crate::model::Environment> for EnvironmentAdminView {
    fn from(env: crate::model::Environment) -> Self {
        Self {
            project: env.project_name,
            name: env.name,
            host: env.host,
            port: env.port,
            deploy_user: env.deploy_user,
        }
    }
}

/// Request body for `POST /api/admin/environments`.
#[derive(Debug, Deserialize)]
pub struct CreateEnvironmentRequest {
    /// Owning project; must already exist.
    pub project: String,
    /// Environment name, unique within the project.
    pub name: String,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: u32,
    /// Deploy account name on the target host.
    pub deploy_user: String,
    /// Plaintext deploy private key, encrypted at rest before storage.
    pub deploy_key: String,
}

/// `POST /api/admin/environments`.
///
/// # Errors
/// Returns `AppError::InvalidInput` if `name` or `port` fail validation,
/// `AppError::NotFound` if the project does not exist, and
/// `AppError::Conflict` if the environment name is already taken.
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateEnvironmentRequest>,
) -> AppResult<Json<EnvironmentAdminView>> {
    validate_name("name", &request.name)?;
    let port = validate_port(request.port)?;

    let environment = state
        .store
        .create_environment(
            &request.project,
            &request.name,
            &request.host,
            port,
            &request.deploy_user,
            request.deploy_key.as_bytes(),
            &state.master_key,
            "admin",
            &ip,
        )
        .await?;

    Ok(Json(EnvironmentAdminView::from(environment)))
}

/// `DELETE /api/admin/environments/{project}/{name}`.
///
/// # Errors
/// Returns `AppError::NotFound` if the environment does not exist.
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Path((project, name)): Path<(String, String)>,
) -> AppResult<()> {
    state.store.delete_environment(&project, &name, "admin", &ip).await
}
