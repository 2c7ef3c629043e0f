// ABOUTME: Environment CRUD (§4.3)
// ABOUTME: Deploy keys are encrypted with the master key before they ever touch disk

use sqlx::Row;

use crate::crypto::MasterKey;
use crate::errors::{AppError, AppResult};
use crate::model::{AuditAction, Environment};

use super::{append_audit_tx, PendingAudit, Store};

fn row_to_environment(row: &sqlx::sqlite::SqliteRow) -> AppResult<Environment> {
    Ok(Environment {
        project_name: row.try_get("project_name").map_err(AppError::internal)?,
        name: row.try_get("name").map_err(AppError::internal)?,
        host: row.try_get("host").map_err(AppError::internal)?,
        port: row.try_get::<i64, _>("port").map_err(AppError::internal)?.try_into().unwrap_or(0),
        deploy_user: row.try_get("deploy_user").map_err(AppError::internal)?,
        deploy_key: row.try_get("deploy_key").map_err(AppError::internal)?,
    })
}

impl Store {
    /// Create an environment under `project_name`, encrypting `deploy_key_plain`
    /// with `master_key` before persisting it. Records `ENV_CREATE`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the project does not exist, or
    /// `AppError::Conflict` if the environment name is already taken within it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_environment(
        &self,
        project_name: &str,
        name: &str,
        host: &str,
        port: u16,
        deploy_user: &str,
        deploy_key_plain: &[u8],
        master_key: &MasterKey,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<Environment> {
        if !self.project_exists(project_name).await? {
            return Err(AppError::not_found(format!("project '{project_name}' not found")));
        }
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM environments WHERE project_name = ? AND name = ?")
                .bind(project_name)
                .bind(name)
                .fetch_optional(self.pool())
                .await
                .map_err(AppError::internal)?;
        if existing.is_some() {
            return Err(AppError::conflict(format!(
                "environment '{name}' already exists in project '{project_name}'"
            )));
        }

        let deploy_key_encrypted = master_key.encrypt(deploy_key_plain)?;

        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO environments (project_name, name, host, port, deploy_user, deploy_key)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(project_name)
        .bind(name)
        .bind(host)
        .bind(i64::from(port))
        .bind(deploy_user)
        .bind(&deploy_key_encrypted)
        .execute(&mut *tx)
        .await
        .map_err(AppError::internal)?;
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::EnvCreate,
                details: format!("created environment '{project_name}/{name}' ({host}:{port})"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;

        Ok(Environment {
            project_name: project_name.to_string(),
            name: name.to_string(),
            host: host.to_string(),
            port,
            deploy_user: deploy_user.to_string(),
            deploy_key: deploy_key_encrypted,
        })
    }

    /// List environments, optionally scoped to one project.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn list_environments(&self, project_name: Option<&str>) -> AppResult<Vec<Environment>> {
        let rows = if let Some(project_name) = project_name {
            sqlx::query("SELECT * FROM environments WHERE project_name = ? ORDER BY name")
                .bind(project_name)
                .fetch_all(self.pool())
                .await
        } else {
            sqlx::query("SELECT * FROM environments ORDER BY project_name, name")
                .fetch_all(self.pool())
                .await
        }
        .map_err(AppError::internal)?;
        rows.iter().map(row_to_environment).collect()
    }

    /// Delete an environment. Records `ENV_DELETE`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if it does not exist.
    pub async fn delete_environment(
        &self,
        project_name: &str,
        name: &str,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<()> {
        let mut tx = self.begin().await?;
        let deleted = sqlx::query("DELETE FROM environments WHERE project_name = ? AND name = ?")
            .bind(project_name)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "environment '{project_name}/{name}' not found"
            )));
        }
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::EnvDelete,
                details: format!("deleted environment '{project_name}/{name}'"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;
        Ok(())
    }
}
