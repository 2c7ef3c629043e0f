// ABOUTME: Project CRUD (§4.3)
// ABOUTME: Deletion is guarded by the existence of environments, never cascades them away silently

use chrono::Utc;
use sqlx::Row;

use crate::errors::{AppError, AppResult};
use crate::model::{AuditAction, Project};

use super::{append_audit_tx, PendingAudit, Store};

impl Store {
    /// Create a project. Records `PROJECT_CREATE`.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the name is already taken.
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<Project> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM projects WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        if existing.is_some() {
            return Err(AppError::conflict(format!("project '{name}' already exists")));
        }

        let mut tx = self.begin().await?;
        sqlx::query("INSERT INTO projects (name, description) VALUES (?, ?)")
            .bind(name)
            .bind(description)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::ProjectCreate,
                details: format!("created project '{name}'"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;

        Ok(Project {
            name: name.to_string(),
            description: description.to_string(),
        })
    }

    /// List every project.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn list_projects(&self) -> AppResult<Vec<Project>> {
        let rows = sqlx::query("SELECT name, description FROM projects ORDER BY name")
            .fetch_all(self.pool())
            .await
            .map_err(AppError::internal)?;
        rows.iter()
            .map(|row| {
                Ok(Project {
                    name: row.try_get("name").map_err(AppError::internal)?,
                    description: row.try_get("description").map_err(AppError::internal)?,
                })
            })
            .collect()
    }

    /// Delete a project. Records `PROJECT_DELETE`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the project does not exist, or
    /// `AppError::Conflict` if it still has environments.
    pub async fn delete_project(&self, name: &str, audit_user: &str, ip: &str) -> AppResult<()> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM projects WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        if existing.is_none() {
            return Err(AppError::not_found(format!("project '{name}' not found")));
        }
        let env_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM environments WHERE project_name = ?")
            .bind(name)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::internal)?;
        if env_count > 0 {
            return Err(AppError::conflict(format!(
                "project '{name}' still has environments; delete them first"
            )));
        }

        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM project_access WHERE project_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        sqlx::query("DELETE FROM projects WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::ProjectDelete,
                details: format!("deleted project '{name}'"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;
        Ok(())
    }

    /// Whether a project exists, used to validate grants and environments.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn project_exists(&self, name: &str) -> AppResult<bool> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM projects WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        Ok(existing.is_some())
    }

    #[cfg(test)]
    pub(crate) async fn in_memory() -> Self {
        Self::connect(std::path::Path::new(":memory:")).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_blocked_while_environments_exist() {
        let store = Store::in_memory().await;
        store.create_project("demo", "desc", "admin", "127.0.0.1").await.unwrap();
        let master_key = crate::crypto::MasterKey::from_hex(&"ab".repeat(32)).unwrap();
        store
            .create_environment(
                "demo",
                "staging",
                "host",
                22,
                "deploy",
                b"private-key",
                &master_key,
                "admin",
                "127.0.0.1",
            )
            .await
            .unwrap();

        let err = store.delete_project("demo", "admin", "127.0.0.1").await.unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::Conflict);
    }
}
