// ABOUTME: Bootstrap, startup and shutdown (§4.10) — the only module that touches the environment directly

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::crypto::{hash_token, MasterKey};
use crate::errors::{AppError, AppResult};
use crate::model::{CaKeyPair, ServerConfigRow};
use crate::notifier::{Notifier, NoopNotifier, SmtpNotifier};
use crate::ratelimit::RateLimiter;
use crate::ssh::CertificateAuthority;
use crate::state::AppState;
use crate::store::Store;

/// The fixed plaintext probed against the master key at `start`, to detect a
/// mismatched key before any store data is touched.
const MASTER_KEY_PROBE_PLAINTEXT: &[u8] = b"keyforge-master-key-probe-v1";

/// Run `init`: generate the CA key pair, hash the admin token, and persist
/// the bootstrap rows. Refuses to run twice against the same data directory.
///
/// # Errors
/// Returns `AppError::Conflict` if the server is already initialized, and
/// `AppError::InvalidInput`/`AppError::Internal` for a malformed master key
/// or admin token, or a storage failure.
pub async fn init(config: &ServerConfig) -> AppResult<()> {
    let master_key = config.master_key()?;
    let admin_token = config.admin_token()?;

    let store = Store::connect(&config.database_path()).await?;
    if store.read_server_config().await?.is_some() {
        return Err(AppError::conflict("server is already initialized"));
    }

    let admin_token_hash = hash_token(&admin_token)?;
    let master_key_probe = master_key.encrypt(MASTER_KEY_PROBE_PLAINTEXT)?;
    let now = chrono::Utc::now();

    store
        .write_server_config(&ServerConfigRow {
            admin_token_hash,
            master_key_fingerprint: master_key.fingerprint(),
            master_key_probe,
            initialized_at: now,
        })
        .await?;

    let (ca, private_key_encrypted) = CertificateAuthority::generate(&master_key, config.cert_validity)?;
    store
        .write_ca_key_pair(&CaKeyPair {
            private_key_encrypted,
            public_key: ca.public_key().to_string(),
            cert_validity: config.cert_validity,
            created_at: now,
            enabled: true,
        })
        .await?;

    tracing::info!(public_key = ca.public_key(), "server initialized");
    Ok(())
}

/// Run `start`: load the bootstrap rows, verify the master key against the
/// stored probe, load the CA signing key, and bind the HTTP listener. Runs
/// until the process receives a shutdown signal.
///
/// # Errors
/// Returns `AppError::Internal` if the server has not been initialized, the
/// master key does not decrypt the stored probe, or the listener cannot bind.
pub async fn start(config: ServerConfig) -> AppResult<()> {
    let master_key = config.master_key()?;
    let store = Store::connect(&config.database_path()).await?;

    let server_config = store
        .read_server_config()
        .await?
        .ok_or_else(|| AppError::internal("server has not been initialized; run `keyforged init` first"))?;

    let decrypted_probe = master_key.decrypt(&server_config.master_key_probe)?;
    if decrypted_probe != MASTER_KEY_PROBE_PLAINTEXT {
        return Err(AppError::internal("master key does not match the one used at init"));
    }

    let ca_key_pair = store
        .read_ca_key_pair()
        .await?
        .ok_or_else(|| AppError::internal("CA key pair is missing; the data directory is inconsistent"))?;
    let ca = CertificateAuthority::load(
        &master_key,
        &ca_key_pair.private_key_encrypted,
        ca_key_pair.public_key,
        ca_key_pair.cert_validity,
        ca_key_pair.enabled,
    )?;

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
        None => Arc::new(NoopNotifier),
    };

    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max_attempts,
        config.rate_limit_window,
        config.rate_limit_lockout,
    ));

    let http_addr = config.http_addr.clone();
    let admin_token_hash: Arc<str> = Arc::from(server_config.admin_token_hash.as_str());
    let state = AppState {
        store,
        ca: Arc::new(ca),
        rate_limiter,
        notifier,
        config: Arc::new(config),
        master_key: Arc::new(master_key),
        admin_token_hash,
    };

    let tls_enabled = std::env::var("KEYFORGE_TLS_ENABLED").as_deref() == Ok("true");
    let app = crate::routes::build(state, tls_enabled);

    let listener = TcpListener::bind(&http_addr).await.map_err(AppError::internal)?;
    tracing::info!(addr = %http_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(AppError::internal)?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM. Draining and store closure are handled by
/// `axum::serve`'s graceful shutdown and `Store`'s `Drop`-free pool, which
/// closes its single connection when the last clone is dropped.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => tracing::error!(%error, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
}
