// ABOUTME: Admin project CRUD endpoints (§4.3, §4.8)

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppResult;
use crate::middleware::{AdminIdentity, ClientIp};
use crate::model::Project;
use crate::state::AppState;
use crate::utils::validation::validate_name;

/// `GET /api/admin/projects`.
///
/// # Errors
/// Returns `AppError::Internal` if the project list cannot be read.
pub async fn list(State(state): State<AppState>, _admin: AdminIdentity) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.store.list_projects().await?))
}

/// Request body for `POST /api/admin/projects`.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Project name; used in environment and principal derivation.
    pub name: String,
    /// Free-text description shown in the admin UI.
    #[serde(default)]
    pub description: String,
}

/// `POST /api/admin/projects`.
///
/// # Errors
/// Returns `AppError::InvalidInput` if `name` fails validation, and
/// `AppError::Conflict` if the name is already taken.
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateProjectRequest>,
) -> AppResult<Json<Project>> {
    validate_name("name", &request.name)?;
    let project = state
        .store
        .create_project(&request.name, &request.description, "admin", &ip)
        .await?;
    Ok(Json(project))
}

/// `GET /api/admin/projects/{name}`.
///
/// # Errors
/// Returns `AppError::NotFound` if the project does not exist.
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(name): Path<String>,
) -> AppResult<Json<Project>> {
    let projects = state.store.list_projects().await?;
    projects
        .into_iter()
        .find(|p| p.name == name)
        .map(Json)
        .ok_or_else(|| crate::errors::AppError::not_found(format!("project '{name}' not found")))
}

/// `DELETE /api/admin/projects/{name}`.
///
/// # Errors
/// Returns `AppError::NotFound` if the project does not exist, or
/// `AppError::Conflict` if it still has environments.
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(name): Path<String>,
) -> AppResult<()> {
    state.store.delete_project(&name, "admin", &ip).await
}
