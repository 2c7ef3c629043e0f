// ABOUTME: Project-access grants (§4.3, §4.6)
// ABOUTME: Grant/revoke are idempotent but every call is still audited, granted or not

use sqlx::Row;

use crate::errors::{AppError, AppResult};
use crate::model::AuditAction;

use super::{append_audit_tx, PendingAudit, Store};

impl Store {
    /// Grant `user_name` access to `project_name`. Idempotent: granting an
    /// already-held project succeeds and still records `ACCESS_GRANT`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user or project does not exist.
    pub async fn grant_access(
        &self,
        user_name: &str,
        project_name: &str,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<()> {
        if self.get_user(user_name).await?.is_none() {
            return Err(AppError::not_found(format!("user '{user_name}' not found")));
        }
        if !self.project_exists(project_name).await? {
            return Err(AppError::not_found(format!("project '{project_name}' not found")));
        }

        let mut tx = self.begin().await?;
        sqlx::query("INSERT OR IGNORE INTO project_access (user_name, project_name) VALUES (?, ?)")
            .bind(user_name)
            .bind(project_name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::AccessGrant,
                details: format!("granted '{user_name}' access to project '{project_name}'"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;
        Ok(())
    }

    /// Revoke `user_name`'s access to `project_name`. Idempotent: revoking
    /// an ungranted project succeeds and still records `ACCESS_REVOKE`.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn revoke_access(
        &self,
        user_name: &str,
        project_name: &str,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<()> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM project_access WHERE user_name = ? AND project_name = ?")
            .bind(user_name)
            .bind(project_name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::AccessRevoke,
                details: format!("revoked '{user_name}' access to project '{project_name}'"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;
        Ok(())
    }

    /// List the project names a user currently holds a grant for.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn granted_projects(&self, user_name: &str) -> AppResult<Vec<String>> {
        let rows = sqlx::query("SELECT project_name FROM project_access WHERE user_name = ? ORDER BY project_name")
            .bind(user_name)
            .fetch_all(self.pool())
            .await
            .map_err(AppError::internal)?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("project_name").map_err(AppError::internal))
            .collect()
    }
}
