// ABOUTME: Invite issuance and the transactional invite -> join -> session -> cert flow (§4.2, §4.3)
// ABOUTME: Invite lookup scans every unredeemed row rather than matching by id, to avoid leaking which token prefix exists

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use crate::authz::resolve_principals;
use crate::crypto::token::{generate_token, INVITE_TOKEN_BYTES, SESSION_TOKEN_BYTES};
use crate::crypto::{hash_token, verify_token};
use crate::errors::{AppError, AppResult};
use crate::model::{AuditAction, Role, User};
use crate::ssh::ca::{CertificateAuthority, MintedCertificate};

use super::{append_audit_tx, PendingAudit, Store};

struct InviteRow {
    token_hash: String,
    user_name: String,
    expires_at: DateTime<Utc>,
}

impl Store {
    /// Create a pending user and a matching invite in one transaction.
    /// Records `USER_CREATE`. Returns the user and the raw invite token —
    /// the only time that token is ever available; only its hash is stored.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the user name is already taken.
    pub async fn invite_user(
        &self,
        name: &str,
        email: &str,
        role: Role,
        invite_ttl: Duration,
        audit_user: &str,
        ip: &str,
    ) -> AppResult<(User, String)> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::internal)?;
        if existing.is_some() {
            return Err(AppError::conflict(format!("user '{name}' already exists")));
        }

        let raw_token = generate_token(INVITE_TOKEN_BYTES);
        let token_hash = hash_token(&raw_token)?;
        let now = Utc::now();
        let expires_at = now + invite_ttl;

        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO users (name, email, role, public_key, created_at, joined_at, mfa_enabled, mfa_secret)
             VALUES (?, ?, ?, NULL, ?, NULL, 0, NULL)",
        )
        .bind(name)
        .bind(email)
        .bind(role_str(role))
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(AppError::internal)?;

        sqlx::query(
            "INSERT INTO invites (token_hash, user_name, created_at, expires_at, redeemed_at)
             VALUES (?, ?, ?, ?, NULL)",
        )
        .bind(&token_hash)
        .bind(name)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(AppError::internal)?;

        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: audit_user.to_string(),
                action: AuditAction::UserCreate,
                details: format!("invited user '{name}' with role '{}'", role_str(role)),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        tx.commit().await.map_err(AppError::internal)?;

        Ok((
            User {
                name: name.to_string(),
                email: email.to_string(),
                role,
                public_key: None,
                created_at: now,
                joined_at: None,
                mfa_enabled: false,
                mfa_secret: None,
            },
            raw_token,
        ))
    }

    async fn find_invite_by_token(&self, raw_token: &str) -> AppResult<Option<InviteRow>> {
        let rows = sqlx::query("SELECT token_hash, user_name, expires_at FROM invites WHERE redeemed_at IS NULL")
            .fetch_all(self.pool())
            .await
            .map_err(AppError::internal)?;

        // Scan every candidate rather than stopping at the first match, so
        // the time taken does not depend on the matching row's position.
        let mut found: Option<InviteRow> = None;
        for row in rows {
            let token_hash: String = row.try_get("token_hash").map_err(AppError::internal)?;
            if verify_token(raw_token, &token_hash) {
                let expires_at: String = row.try_get("expires_at").map_err(AppError::internal)?;
                found = Some(InviteRow {
                    token_hash,
                    user_name: row.try_get("user_name").map_err(AppError::internal)?,
                    expires_at: DateTime::parse_from_rfc3339(&expires_at)
                        .map_err(AppError::internal)?
                        .with_timezone(&Utc),
                });
            }
        }
        Ok(found)
    }

    /// Redeem an invite: validate the token, mint a certificate for the
    /// caller's public key, and atomically mark the invite redeemed, attach
    /// the public key to the user, and open a session. Records `USER_JOIN`,
    /// `SESSION_CREATE` and `CERT_ISSUE` as one transaction.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the token does not match any pending,
    /// unexpired invite (including a second attempt on an already-redeemed
    /// one), and `AppError::Internal` if certificate minting fails.
    pub async fn redeem_invite(
        &self,
        raw_token: &str,
        public_key_openssh: &str,
        ip: &str,
        ca: &CertificateAuthority,
        session_ttl: Duration,
    ) -> AppResult<(User, Option<MintedCertificate>, String)> {
        let invite = self
            .find_invite_by_token(raw_token)
            .await?
            .ok_or_else(|| AppError::not_found("invite token is invalid or already redeemed"))?;

        if invite.expires_at < Utc::now() {
            return Err(AppError::not_found("invite token has expired"));
        }

        let user = self
            .get_user(&invite.user_name)
            .await?
            .ok_or_else(|| AppError::internal("invite references a user that no longer exists"))?;
        if user.joined_at.is_some() {
            return Err(AppError::not_found("invite token is invalid or already redeemed"));
        }

        // With no grants yet at join time, the visible-environment set is
        // empty, so the principal list is deterministically just the user's
        // own name — no environment lookup needed before minting.
        let principals = resolve_principals(&user.name, &[]);
        let cert = ca.is_enabled().then(|| ca.mint(public_key_openssh, &user.name, &principals)).transpose()?;

        let raw_session_token = generate_token(SESSION_TOKEN_BYTES);
        let session_token_hash = hash_token(&raw_session_token)?;
        let now = Utc::now();
        let session_expires_at = now + session_ttl;

        let mut tx = self.begin().await?;
        sqlx::query("UPDATE invites SET redeemed_at = ? WHERE token_hash = ?")
            .bind(now.to_rfc3339())
            .bind(&invite.token_hash)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;

        sqlx::query("UPDATE users SET public_key = ?, joined_at = ? WHERE name = ?")
            .bind(public_key_openssh)
            .bind(now.to_rfc3339())
            .bind(&user.name)
            .execute(&mut *tx)
            .await
            .map_err(AppError::internal)?;

        sqlx::query(
            "INSERT INTO sessions (token_hash, user_name, created_at, expires_at, last_seen_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session_token_hash)
        .bind(&user.name)
        .bind(now.to_rfc3339())
        .bind(session_expires_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(AppError::internal)?;

        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: user.name.clone(),
                action: AuditAction::UserJoin,
                details: "redeemed invite and attached public key".to_string(),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        append_audit_tx(
            &mut tx,
            &PendingAudit {
                user_name: user.name.clone(),
                action: AuditAction::SessionCreate,
                details: "session opened at join".to_string(),
                ip_address: ip.to_string(),
            },
        )
        .await?;
        if let Some(cert) = &cert {
            append_audit_tx(
                &mut tx,
                &PendingAudit {
                    user_name: user.name.clone(),
                    action: AuditAction::CertIssue,
                    details: format!("serial {} principals {:?}", cert.serial, principals),
                    ip_address: ip.to_string(),
                },
            )
            .await?;
        }
        tx.commit().await.map_err(AppError::internal)?;

        let joined_user = User {
            public_key: Some(public_key_openssh.to_string()),
            joined_at: Some(now),
            ..user
        };
        Ok((joined_user, cert, raw_session_token))
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin",
        Role::Dev => "dev",
        Role::Readonly => "readonly",
    }
}
