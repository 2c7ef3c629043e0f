// ABOUTME: Typed persistence layer backed by SQLite (§4.3)
// ABOUTME: A single concrete Store, not a trait: the core targets exactly one storage engine

//! The Store owns all persisted state. Storage engine choice is explicitly
//! out of scope for the core (§1), so unlike a multi-backend abstraction,
//! `Store` is a concrete struct wrapping a `SqlitePool` rather than a trait
//! with swappable implementations — there is, by design, only ever one.
//!
//! Mutations that must be atomic with the audit entries they produce use
//! [`Store::with_tx`] internally; see each submodule for the operations
//! that compose multiple statements into one transaction.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::audit::chain_hash;
use crate::errors::{AppError, AppResult};
use crate::model::{AuditAction, AuditEntry};

/// Schema statements, applied idempotently on every startup (`init` and `start`).
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS server_config (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        admin_token_hash TEXT NOT NULL,
        master_key_fingerprint TEXT NOT NULL,
        master_key_probe TEXT NOT NULL,
        initialized_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS ca_key_pair (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        private_key_encrypted TEXT NOT NULL,
        public_key TEXT NOT NULL,
        cert_validity_secs INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        enabled INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        name TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        role TEXT NOT NULL,
        public_key TEXT,
        created_at TEXT NOT NULL,
        joined_at TEXT,
        mfa_enabled INTEGER NOT NULL DEFAULT 0,
        mfa_secret TEXT
    )",
    "CREATE TABLE IF NOT EXISTS invites (
        token_hash TEXT PRIMARY KEY,
        user_name TEXT NOT NULL REFERENCES users(name),
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        redeemed_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        token_hash TEXT PRIMARY KEY,
        user_name TEXT NOT NULL REFERENCES users(name),
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        last_seen_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        name TEXT PRIMARY KEY,
        description TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS environments (
        project_name TEXT NOT NULL REFERENCES projects(name),
        name TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER NOT NULL,
        deploy_user TEXT NOT NULL,
        deploy_key TEXT NOT NULL,
        PRIMARY KEY (project_name, name)
    )",
    "CREATE TABLE IF NOT EXISTS project_access (
        user_name TEXT NOT NULL REFERENCES users(name),
        project_name TEXT NOT NULL REFERENCES projects(name),
        PRIMARY KEY (user_name, project_name)
    )",
    "CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        user_name TEXT NOT NULL,
        action TEXT NOT NULL,
        details TEXT NOT NULL,
        ip_address TEXT NOT NULL,
        prev_hash TEXT NOT NULL,
        hash TEXT NOT NULL
    )",
];

/// Typed persistence for every entity in §3.
///
/// A single-connection pool (`max_connections(1)`) is used deliberately: the
/// concurrency model (§5) requires mutations to serialize on a single
/// writer while SQLite itself only supports one writer at a time, so a
/// larger pool would only add connection-acquisition overhead without any
/// extra write concurrency.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if absent) the SQLite database at `path` and apply the schema.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if the database file cannot be opened or
    /// the schema cannot be applied.
    pub async fn connect(path: &std::path::Path) -> AppResult<Self> {
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent).map_err(AppError::internal)?;
        }
        let options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(AppError::internal)?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(AppError::internal)?;
        }
        Ok(())
    }

    pub(crate) async fn begin(&self) -> AppResult<Transaction<'_, Sqlite>> {
        self.pool.begin().await.map_err(AppError::internal)
    }

    /// Read-only access to the pool for submodules that don't need a transaction.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A single audit entry still to be persisted, with its action-specific
/// fields already resolved. Used to compose multi-entry transactions (e.g.
/// join emits `USER_JOIN`, `SESSION_CREATE`, and optionally `CERT_ISSUE`).
pub struct PendingAudit {
    /// Actor recorded on the entry.
    pub user_name: String,
    /// What happened.
    pub action: AuditAction,
    /// Opaque detail string.
    pub details: String,
    /// Caller's IP address.
    pub ip_address: String,
}

/// Append one audit entry within an already-open transaction, chaining from
/// the current tail hash. Returns the persisted entry.
pub(crate) async fn append_audit_tx(
    tx: &mut Transaction<'_, Sqlite>,
    audit: &PendingAudit,
) -> AppResult<AuditEntry> {
    let tail: Option<String> = sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY id DESC LIMIT 1")
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::internal)?;
    let prev_hash = tail.unwrap_or_default();
    let timestamp = chrono::Utc::now();

    let next_id: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM audit_log")
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::internal)?;

    let hash = chain_hash(
        next_id,
        timestamp,
        &audit.user_name,
        audit.action,
        &audit.details,
        &audit.ip_address,
        &prev_hash,
    );

    sqlx::query(
        "INSERT INTO audit_log (id, timestamp, user_name, action, details, ip_address, prev_hash, hash)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(next_id)
    .bind(timestamp.to_rfc3339())
    .bind(&audit.user_name)
    .bind(audit.action.as_str())
    .bind(&audit.details)
    .bind(&audit.ip_address)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut **tx)
    .await
    .map_err(AppError::internal)?;

    Ok(AuditEntry {
        id: next_id,
        timestamp,
        user_name: audit.user_name.clone(),
        action: audit.action,
        details: audit.details.clone(),
        ip_address: audit.ip_address.clone(),
        prev_hash,
        hash,
    })
}

/// Bootstrap rows: `ServerConfig` and `CaKeyPair`.
pub mod bootstrap;
/// Project-access grants.
pub mod access;
/// Audit log reads (listing, chain verification support).
pub mod audit;
/// Environment CRUD.
pub mod environments;
/// Invite creation and the transactional join/redeem flow.
pub mod invites;
/// Project CRUD.
pub mod projects;
/// Session lifecycle.
pub mod sessions;
/// User CRUD.
pub mod users;
