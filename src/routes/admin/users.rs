// ABOUTME: Admin user, invite and project-access endpoints (§4.3, §4.7, §4.8)

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::middleware::{AdminIdentity, ClientIp};
use crate::model::{Role, User};
use crate::state::AppState;
use crate::utils::validation::{validate_email, validate_name};

/// `GET /api/admin/users`.
///
/// # Errors
/// Returns `AppError::Internal` if the user list cannot be read.
pub async fn list(State(state): State<AppState>, _admin: AdminIdentity) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

/// Request body for `POST /api/admin/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// The new user's unique name.
    pub name: String,
    /// Contact email, used by the Notifier.
    pub email: String,
    /// Access role; must be one of `admin`, `dev`, `readonly`.
    pub role: String,
}

/// Response body for `POST /api/admin/users`.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    /// The created (pending) user.
    pub user: User,
    /// The raw invite token; this is the only time it is visible.
    pub invite_token: String,
}

/// `POST /api/admin/users`. Creates a pending user and an invite.
///
/// # Errors
/// Returns `AppError::InvalidInput` if `name`, `email` or `role` fail
/// validation, and `AppError::Conflict` if the name is already taken.
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<Json<CreateUserResponse>> {
    validate_name("name", &request.name)?;
    validate_email(&request.email)?;
    let role = Role::parse(&request.role).ok_or_else(|| AppError::invalid_input("role must be admin, dev or readonly"))?;

    let (user, invite_token) = state
        .store
        .invite_user(&request.name, &request.email, role, state.config.invite_ttl, "admin", &ip)
        .await?;

    state.notifier.notify_invited(&user.name, &user.email, &invite_token).await;

    Ok(Json(CreateUserResponse { user, invite_token }))
}

/// `GET /api/admin/users/{name}`.
///
/// # Errors
/// Returns `AppError::NotFound` if the user does not exist.
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    Path(name): Path<String>,
) -> AppResult<Json<User>> {
    state
        .store
        .get_user(&name)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("user '{name}' not found")))
}

/// `DELETE /api/admin/users/{name}`.
///
/// # Errors
/// Returns `AppError::NotFound` if the user does not exist.
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(name): Path<String>,
) -> AppResult<()> {
    state.store.delete_user(&name, "admin", &ip).await
}

/// Request body for the project-access endpoints.
#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    /// The project to grant or revoke.
    pub project: String,
}

/// `POST /api/admin/users/{name}/access`.
///
/// # Errors
/// Returns `AppError::NotFound` if the user or project does not exist.
pub async fn grant_access(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(name): Path<String>,
    Json(request): Json<AccessRequest>,
) -> AppResult<()> {
    state.store.grant_access(&name, &request.project, "admin", &ip).await?;
    if let Some(user) = state.store.get_user(&name).await? {
        state
            .notifier
            .notify_access_changed(&user.name, &user.email, &request.project, true)
            .await;
    }
    Ok(())
}

/// `DELETE /api/admin/users/{name}/access`.
///
/// # Errors
/// Returns `AppError::Internal` if the grant cannot be removed.
pub async fn revoke_access(
    State(state): State<AppState>,
    _admin: AdminIdentity,
    ClientIp(ip): ClientIp,
    Path(name): Path<String>,
    Json(request): Json<AccessRequest>,
) -> AppResult<()> {
    state.store.revoke_access(&name, &request.project, "admin", &ip).await?;
    if let Some(user) = state.store.get_user(&name).await? {
        state
            .notifier
            .notify_access_changed(&user.name, &user.email, &request.project, false)
            .await;
    }
    Ok(())
}
