// ABOUTME: Entity types for the credential server's data model
// ABOUTME: Mirrors the Store's row shapes; wire (de)serialization lives on these directly

//! Data model (§3). These are the Store's row shapes and, where annotated,
//! double as wire types for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's role, gating admin-only endpoints and visible-environment scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sees and manages everything; implicitly granted every project.
    Admin,
    /// Ordinary developer, scoped to granted projects.
    Dev,
    /// Read-only variant of `Dev`; the core does not yet differentiate
    /// their write access (no write endpoints exist below admin), but the
    /// role is modeled so downstream SSH host policy can distinguish them.
    Readonly,
}

impl Role {
    /// Parse a role from its wire string, rejecting anything outside the closed set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "dev" => Some(Self::Dev),
            "readonly" => Some(Self::Readonly),
            _ => None,
        }
    }
}

/// A team member. `public_key` and `joined_at` are populated by `join`.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique, URL-safe, stable identifier.
    pub name: String,
    /// Contact email, used by the Notifier.
    pub email: String,
    /// Access role.
    pub role: Role,
    /// OpenSSH authorized-keys formatted public key, present after join.
    pub public_key: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// When the user redeemed their invite.
    pub joined_at: Option<DateTime<Utc>>,
    /// Whether a TOTP secret has been confirmed.
    pub mfa_enabled: bool,
    /// Encrypted base32 TOTP secret; never serialized to the wire.
    #[serde(skip)]
    pub mfa_secret: Option<String>,
}

/// A one-time enrollment credential awaiting redemption.
#[derive(Debug, Clone)]
pub struct Invite {
    /// Argon2id hash of the raw token; the token itself is never stored.
    pub token_hash: String,
    /// The user this invite belongs to.
    pub user_name: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Redemption deadline.
    pub expires_at: DateTime<Utc>,
    /// Set once the invite has been redeemed.
    pub redeemed_at: Option<DateTime<Utc>>,
}

/// A bearer session authenticating a user's API calls.
#[derive(Debug, Clone)]
pub struct Session {
    /// Argon2id hash of the raw session token.
    pub token_hash: String,
    /// The user this session authenticates.
    pub user_name: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Expiry; past this point the session is treated as absent.
    pub expires_at: DateTime<Utc>,
    /// Updated on every successful authenticated request.
    pub last_seen_at: DateTime<Utc>,
}

/// A named grouping of environments sharing authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique, URL-safe project name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

/// A deployable target within a project.
#[derive(Debug, Clone, Serialize)]
pub struct Environment {
    /// Owning project's name.
    pub project_name: String,
    /// Environment name, unique within the project.
    pub name: String,
    /// SSH host.
    pub host: String,
    /// SSH port.
    pub port: u16,
    /// The OS user certificates authorize SSH sessions as.
    pub deploy_user: String,
    /// AES-256-GCM encrypted private key blob; never serialized to the wire.
    #[serde(skip)]
    pub deploy_key: String,
}

/// A grant of project access to a user. Existence of the row is the grant;
/// there is no additional state.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectAccess {
    /// Grantee.
    pub user_name: String,
    /// Project the grant applies to.
    pub project_name: String,
}

/// A closed vocabulary of state-changing actions recorded in the audit chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Admin created a pending user.
    UserCreate,
    /// Admin deleted a user, cascading sessions and grants.
    UserDelete,
    /// A user redeemed their invite.
    UserJoin,
    /// A session was minted (join, or future re-auth).
    SessionCreate,
    /// Admin created a project.
    ProjectCreate,
    /// Admin deleted a project.
    ProjectDelete,
    /// Admin created an environment.
    EnvCreate,
    /// Admin deleted an environment.
    EnvDelete,
    /// A project-access grant was requested (idempotent; recorded regardless).
    AccessGrant,
    /// A project-access grant removal was requested (idempotent; recorded regardless).
    AccessRevoke,
    /// A certificate was minted during join.
    CertIssue,
    /// A certificate was re-minted via renewal.
    CertRenew,
    /// MFA enrollment was started.
    MfaSetup,
    /// MFA enrollment was confirmed with a valid TOTP code.
    MfaVerify,
    /// An authentication attempt failed.
    AuthFailure,
    /// The admin bearer token was used successfully.
    AdminLogin,
}

impl AuditAction {
    /// Upper snake-case wire representation, matching the closed vocabulary in §4.4.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserCreate => "USER_CREATE",
            Self::UserDelete => "USER_DELETE",
            Self::UserJoin => "USER_JOIN",
            Self::SessionCreate => "SESSION_CREATE",
            Self::ProjectCreate => "PROJECT_CREATE",
            Self::ProjectDelete => "PROJECT_DELETE",
            Self::EnvCreate => "ENV_CREATE",
            Self::EnvDelete => "ENV_DELETE",
            Self::AccessGrant => "ACCESS_GRANT",
            Self::AccessRevoke => "ACCESS_REVOKE",
            Self::CertIssue => "CERT_ISSUE",
            Self::CertRenew => "CERT_RENEW",
            Self::MfaSetup => "MFA_SETUP",
            Self::MfaVerify => "MFA_VERIFY",
            Self::AuthFailure => "AUTH_FAILURE",
            Self::AdminLogin => "ADMIN_LOGIN",
        }
    }
}

/// One hash-chained, append-only audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Monotonically increasing sequence number.
    pub id: i64,
    /// UTC, truncated to second precision.
    pub timestamp: DateTime<Utc>,
    /// Actor; `"admin"` for admin-bearer actions, the user name otherwise.
    pub user_name: String,
    /// What happened.
    pub action: AuditAction,
    /// Opaque text or JSON detail specific to the action.
    pub details: String,
    /// Caller's IP address.
    pub ip_address: String,
    /// Hash of the previous entry, or `""` for the first entry.
    pub prev_hash: String,
    /// `SHA256(id|timestamp|user|action|details|ip|prev_hash)`, hex-encoded.
    pub hash: String,
}

/// The server's single Ed25519 signing key, persisted once at `init`.
#[derive(Debug, Clone)]
pub struct CaKeyPair {
    /// AES-256-GCM encrypted Ed25519 private key.
    pub private_key_encrypted: String,
    /// OpenSSH formatted public key, plaintext.
    pub public_key: String,
    /// Validity window applied to every minted certificate.
    pub cert_validity: chrono::Duration,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// When false, the CA issues no certificates (key-only mode).
    pub enabled: bool,
}

/// The server's single bootstrap configuration row.
#[derive(Debug, Clone)]
pub struct ServerConfigRow {
    /// Argon2id hash of the admin bearer token.
    pub admin_token_hash: String,
    /// SHA-256 fingerprint of the master key supplied at `init`.
    pub master_key_fingerprint: String,
    /// A master-key-encrypted probe value, used to detect a mismatched key at `start`.
    pub master_key_probe: String,
    /// When `init` ran.
    pub initialized_at: DateTime<Utc>,
}
