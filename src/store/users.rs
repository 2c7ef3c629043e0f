// ABOUTME: User CRUD (§4.3)
// ABOUTME: Create and delete are audited; deletion cascades sessions, invites and grants

use chrono::Utc;
use sqlx::Row;

use crate::errors::{AppError, AppResult};
use crate::model::{AuditAction, Role, User};

use super::{append_audit_tx, PendingAudit, Store};

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> AppResult<User> {
    let role_str: String = row.try_get("role").map_err(AppError::internal)?;
    let role = Role::parse(&role_str).ok_or_else(|| AppError::internal("stored role is not recognized"))?;
    let created_at: String = row.try_get("created_at").map_err(AppError::internal)?;
    let joined_at: Option<String> = row.try_get("joined_at").map_err(AppError::internal)?;
    Ok(User {
        name: row.try_get("name").map_err(AppError::internal)?,
        email: row.try_get("email").map_err(AppError::internal)?,
        role,
        public_key: row.try_get("public_key").map_err(AppError::internal)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(AppError::internal)?
            .with_timezone(&Utc),
        joined_at: joined_at
            .map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
            .transpose()
            .map_err(AppError::internal)?,
        mfa_enabled: row.try_get::<i64, _>("mfa_enabled").map_err(AppError::internal)? != 0,
        mfa_secret: row.try_get("mfa_secret").map_err(AppError::internal)?,
    })
}

impl Store {
    /// Create a pending user (no public key, not yet joined). Records `USER_CREATE`.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if a user with this name already exists.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        role: Role,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<User> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        if existing.is_some() {
            return Err(AppError::conflict(format!("user '{name}' already exists")));
        }

        let created_at = Utc::now();
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO users (name, email, role, public_key, created_at, joined_at, mfa_enabled, mfa_secret)
             VALUES (?, ?, ?, NULL, ?, NULL, 0, NULL)",
        )
        .bind(name)
        .bind(email)
        .bind(role_str(role))
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(AppError::internal)?;

        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::UserCreate,
                details: format!("created user '{name}' with role '{}'", role_str(role)),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;

        Ok(User {
            name: name.to_string(),
            email: email.to_string(),
            role,
            public_key: None,
            created_at,
            joined_at: None,
            mfa_enabled: false,
            mfa_secret: None,
        })
    }

    /// Fetch a user by name.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn get_user(&self, name: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        row.as_ref().map(row_to_user).transpose()
    }

    /// List every user.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY name")
            .fetch_all(self.pool())
            .await
            .map_err(AppError::internal)?;
        rows.iter().map(row_to_user).collect()
    }

    /// Delete a user, cascading their sessions, invites and project-access
    /// grants. Records `USER_DELETE`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn delete_user(&self, name: &str, audit_user: &str, ip: &str) -> AppResult<()> {
        let mut tx = self.begin().await?;
        let deleted = sqlx::query("DELETE FROM users WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user '{name}' not found")));
        }
        sqlx::query("DELETE FROM sessions WHERE user_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        sqlx::query("DELETE FROM invites WHERE user_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;
        sqlx::query("DELETE FROM project_access WHERE user_name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;

        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::UserDelete,
                details: format!("deleted user '{name}'"),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;
        Ok(())
    }

    /// Store a pending (unconfirmed) TOTP secret for `name`. Does not set
    /// `mfa_enabled`; calling this again before confirmation replaces the
    /// pending secret.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn set_pending_mfa_secret(&self, name: &str, encrypted_secret: &str) -> AppResult<()> {
        let updated = sqlx::query("UPDATE users SET mfa_secret = ? WHERE name = ?")
            .bind(encrypted_secret)
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(AppError::internal)?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user '{name}' not found")));
        }
        Ok(())
    }

    /// Mark MFA enabled for `name` after a successful TOTP confirmation.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn confirm_mfa(&self, name: &str) -> AppResult<()> {
        let updated = sqlx::query("UPDATE users SET mfa_enabled = 1 WHERE name = ?")
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(AppError::internal)?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(format!("user '{name}' not found")));
        }
        Ok(())
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Dev => "dev",
        Role::Readonly => "readonly",
    }
}
