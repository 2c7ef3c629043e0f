// ABOUTME: Shared application state, injected into every handler via axum::extract::State
// ABOUTME: Composed once at startup in lifecycle::start and cloned cheaply per request

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::crypto::MasterKey;
use crate::notifier::Notifier;
use crate::ratelimit::RateLimiter;
use crate::ssh::CertificateAuthority;
use crate::store::Store;

/// Everything a handler needs, composed once at `start` and shared via `Arc`-backed clones.
#[derive(Clone)]
pub struct AppState {
    /// Persistence.
    pub store: Store,
    /// SSH certificate authority, read-only after startup.
    pub ca: Arc<CertificateAuthority>,
    /// Process-wide per-IP rate limiter.
    pub rate_limiter: Arc<RateLimiter>,
    /// Best-effort notification dispatch.
    pub notifier: Arc<dyn Notifier>,
    /// Process configuration loaded at startup.
    pub config: Arc<ServerConfig>,
    /// The master symmetric key, held only in memory.
    pub master_key: Arc<MasterKey>,
    /// Argon2id hash of the admin bearer token, loaded from `ServerConfig`.
    pub admin_token_hash: Arc<str>,
}
