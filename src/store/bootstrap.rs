// ABOUTME: Server config and CA key-pair bootstrap rows, written once at init (§4.10)
// ABOUTME: Both tables are single-row, enforced by a CHECK(id = 1) primary key

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::errors::{AppError, AppResult};
use crate::model::{CaKeyPair, ServerConfigRow};

use super::Store;

impl Store {
    /// Write the bootstrap `ServerConfig` row. Fails if one already exists;
    /// `init` is meant to run exactly once.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the server has already been initialized.
    pub async fn write_server_config(&self, row: &ServerConfigRow) -> AppResult<()> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM server_config WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        if existing.is_some() {
            return Err(AppError::conflict("server is already initialized"));
        }
        sqlx::query(
            "INSERT INTO server_config (id, admin_token_hash, master_key_fingerprint, master_key_probe, initialized_at)
             VALUES (1, ?, ?, ?, ?)",
        )
        .bind(&row.admin_token_hash)
        .bind(&row.master_key_fingerprint)
        .bind(&row.master_key_probe)
        .bind(row.initialized_at.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(AppError::internal)?;
        Ok(())
    }

    /// Read the bootstrap `ServerConfig` row, if `init` has run.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn read_server_config(&self) -> AppResult<Option<ServerConfigRow>> {
        let row = sqlx::query("SELECT * FROM server_config WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        row.map(|row| {
            let initialized_at: String = row.try_get("initialized_at").map_err(AppError::internal)?;
            Ok(ServerConfigRow {
                admin_token_hash: row.try_get("admin_token_hash").map_err(AppError::internal)?,
                master_key_fingerprint: row.try_get("master_key_fingerprint").map_err(AppError::internal)?,
                master_key_probe: row.try_get("master_key_probe").map_err(AppError::internal)?,
                initialized_at: DateTime::parse_from_rfc3339(&initialized_at)
                    .map_err(AppError::internal)?
                    .with_timezone(&Utc),
            })
        })
        .transpose()
    }

    /// Write the bootstrap CA key pair row.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if a CA key pair already exists.
    pub async fn write_ca_key_pair(&self, row: &CaKeyPair) -> AppResult<()> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM ca_key_pair WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        if existing.is_some() {
            return Err(AppError::conflict("a CA key pair already exists"));
        }
        sqlx::query(
            "INSERT INTO ca_key_pair (id, private_key_encrypted, public_key, cert_validity_secs, created_at, enabled)
             VALUES (1, ?, ?, ?, ?, ?)",
        )
        .bind(&row.private_key_encrypted)
        .bind(&row.public_key)
        .bind(row.cert_validity.num_seconds())
        .bind(row.created_at.to_rfc3339())
        .bind(row.enabled)
        .execute(self.pool())
        .await
        .map_err(AppError::internal)?;
        Ok(())
    }

    /// Read the bootstrap CA key pair row, if `init` has run.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn read_ca_key_pair(&self) -> AppResult<Option<CaKeyPair>> {
        let row = sqlx::query("SELECT * FROM ca_key_pair WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        row.map(|row| {
            let created_at: String = row.try_get("created_at").map_err(AppError::internal)?;
            let validity_secs: i64 = row.try_get("cert_validity_secs").map_err(AppError::internal)?;
            Ok(CaKeyPair {
                private_key_encrypted: row.try_get("private_key_encrypted").map_err(AppError::internal)?,
                public_key: row.try_get("public_key").map_err(AppError::internal)?,
                cert_validity: chrono::Duration::seconds(validity_secs),
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(AppError::internal)?
                    .with_timezone(&Utc),
                enabled: row.try_get("enabled").map_err(AppError::internal)?,
            })
        })
        .transpose()
    }

    /// Disable or re-enable certificate issuance, leaving the signing key intact.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn set_ca_enabled(&self, enabled: bool) -> AppResult<()> {
        sqlx::query("UPDATE ca_key_pair SET enabled = ? WHERE id = 1")
            .bind(enabled)
            .execute(self.pool())
            .await
            .map_err(AppError::internal)?;
        Ok(())
    }
}
