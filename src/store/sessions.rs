// ABOUTME: Session lookup and lifecycle (§4.3)
// ABOUTME: Lookup scans every live session rather than indexing by raw token, since only the hash is stored

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::crypto::verify_token;
use crate::errors::{AppError, AppResult};
use crate::model::Session;

use super::Store;

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> AppResult<Session> {
    let created_at: String = row.try_get("created_at").map_err(AppError::internal)?;
    let expires_at: String = row.try_get("expires_at").map_err(AppError::internal)?;
    let last_seen_at: String = row.try_get("last_seen_at").map_err(AppError::internal)?;
    Ok(Session {
        token_hash: row.try_get("token_hash").map_err(AppError::internal)?,
        user_name: row.try_get("user_name").map_err(AppError::internal)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(AppError::internal)?
            .with_timezone(&Utc),
        expires_at: DateTime::parse_from_rfc3339(&expires_at)
            .map_err(AppError::internal)?
            .with_timezone(&Utc),
        last_seen_at: DateTime::parse_from_rfc3339(&last_seen_at)
            .map_err(AppError::internal)?
            .with_timezone(&Utc),
    })
}

impl Store {
    /// Look up the session matching a raw bearer token, scanning every
    /// session so lookup time does not depend on which row (if any)
    /// matches. Expired rows encountered along the way are deleted on the
    /// spot rather than left for a background sweep (there is none).
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query or decode failure.
    pub async fn get_session_by_token(&self, raw_token: &str) -> AppResult<Option<Session>> {
        let now = Utc::now();
        let rows = sqlx::query("SELECT * FROM sessions")
            .fetch_all(self.pool())
            .await
            .map_err(AppError::internal)?;

        let mut found: Option<Session> = None;
        let mut expired_hashes = Vec::new();
        for row in &rows {
            let session = row_to_session(row)?;
            if session.expires_at <= now {
                expired_hashes.push(session.token_hash);
                continue;
            }
            if verify_token(raw_token, &session.token_hash) {
                found = Some(session);
            }
        }
        for token_hash in expired_hashes {
            sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
                .bind(token_hash)
                .execute(self.pool())
                .await
                .map_err(AppError::internal)?;
        }
        Ok(found)
    }

    /// Update `last_seen_at` to now for a session, called on every
    /// successfully authenticated request.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn touch_session(&self, token_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET last_seen_at = ? WHERE token_hash = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(token_hash)
            .execute(self.pool())
            .await
            .map_err(AppError::internal)?;
        Ok(())
    }

    /// Delete every session belonging to a user, e.g. on role change or
    /// forced logout.
    ///
    /// # Errors
    /// Returns `AppError::Internal` on a query failure.
    pub async fn delete_sessions_for_user(&self, user_name: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE user_name = ?")
            .bind(user_name)
            .execute(self.pool())
            .await
            .map_err(AppError::internal)?;
        Ok(())
    }
}
