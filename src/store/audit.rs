// ABOUTME: Audit log reads and single-entry appends outside a larger transaction (§4.4)
// ABOUTME: Compound mutations append their own entries inline via append_audit_tx instead

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::errors::{AppError, AppResult};
use crate::model::{AuditAction, AuditEntry};

use super::{append_audit_tx, PendingAudit, Store};

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> AppResult<AuditEntry> {
    let action_str: String = row.try_get("action").map_err(AppError::internal)?;
    let action = parse_action(&action_str).ok_or_else(|| AppError::internal("stored audit action is not recognized"))?;
    let timestamp: String = row.try_get("timestamp").map_err(AppError::internal)?;
    Ok(AuditEntry {
        id: row.try_get("id").map_err(AppError::internal)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(AppError::internal)?
            .with_timezone(&Utc),
        user_name: row.try_get("user_name").map_err(AppError::internal)?,
        action,
        details: row.try_get("details").map_err(AppError::internal)?,
        ip_address: row.try_get("ip_address").map_err(AppError::internal)?,
        prev_hash: row.try_get("prev_hash").map_err(AppError::internal)?,
        hash: row.try_get("hash").map_err(AppError::internal)?,
    })
}

fn parse_action(value: &str) -> Option<AuditAction> {
    use AuditAction::{
        AccessGrant, AccessRevoke, AdminLogin, AuthFailure, CertIssue, CertRenew, EnvCreate, EnvDelete, MfaSetup,
        MfaVerify, ProjectCreate, ProjectDelete, SessionCreate, UserCreate, UserDelete, UserJoin,
    };
    Some(match value {
        "USER_CREATE" => UserCreate,
        "USER_DELETE" => UserDelete,
        "USER_JOIN" => UserJoin,
        "SESSION_CREATE" => SessionCreate,
        "PROJECT_CREATE" => ProjectCreate,
        "PROJECT_DELETE" => ProjectDelete,
        "ENV_CREATE" => EnvCreate,
        "ENV_DELETE" => EnvDelete,
        "ACCESS_GRANT" => AccessGrant,
        "ACCESS_REVOKE" => AccessRevoke,
        "CERT_ISSUE" => CertIssue,
        "CERT_RENEW" => CertRenew,
        "MFA_SETUP" => MfaSetup,
        "MFA_VERIFY" => MfaVerify,
        "AUTH_FAILURE" => AuthFailure,
        "ADMIN_LOGIN" => AdminLogin,
        _ => return None,
    })
}

impl Store {
    /// Append one audit entry on its own, for actions with no accompanying
    /// row mutation (`AUTH_FAILURE`, `ADMIN_LOGIN`, `CERT_RENEW`, MFA actions).
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn append_audit(
        &self,
        user_name: &str,
        action: AuditAction,
        details: impl Into<String>,
        ip_address: &str,
    ) -> AppResult<AuditEntry> {
        let mut tx = self.begin().await?;
        let entry = append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: user_name.to_string(),
                action,
                details: details.into(),
                ip_address: ip_address.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;
        Ok(entry)
    }

    /// List the full audit chain in append order.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn list_audit(&self) -> AppResult<Vec<AuditEntry>> {
        let rows = sqlx::query("SELECT * FROM audit_log ORDER BY id ASC")
            .fetch_all(self.pool())
            .await
            .map_err(AppError::internal)?;
        rows.iter().map(row_to_entry).collect()
    }
}
