// ABOUTME: POST /api/join — redeem an invite, receive a session, key pair and certificate (§4.7)

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::middleware::ClientIp;
use crate::ssh::keypair;
use crate::state::AppState;

/// Request body for `POST /api/join`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    /// The raw invite token received out-of-band (e.g. by email).
    pub invite_token: String,
}

/// Response body for `POST /api/join`.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    /// Bearer token for subsequent authenticated requests.
    pub session_token: String,
    /// OpenSSH PEM private key, generated for this join and never persisted.
    pub private_key: String,
    /// OpenSSH authorized-keys public key, now attached to the user record.
    pub public_key: String,
    /// OpenSSH user certificate, present only if the CA is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    /// Whether the CA is currently minting certificates.
    pub ca_enabled: bool,
    /// Certificate expiry, present only alongside `certificate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<chrono::DateTime<chrono::Utc>>,
}

/// `POST /api/join`.
///
/// # Errors
/// Returns `AppError::NotFound` if the invite token is invalid, expired or
/// already redeemed, and `AppError::RateLimited` if the caller's IP is
/// locked out.
pub async fn join(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<JoinRequest>,
) -> AppResult<Json<JoinResponse>> {
    if state.rate_limiter.is_locked_out(&ip) {
        return Err(crate::errors::AppError::rate_limited(
            "too many failed attempts; try again later",
        ));
    }

    let key_pair = keypair::generate_ed25519()?;

    let result = state
        .store
        .redeem_invite(
            &request.invite_token,
            &key_pair.public_key_openssh,
            &ip,
            &state.ca,
            state.config.session_ttl,
        )
        .await;

    let (user, cert, session_token) = match result {
        Ok(value) => {
            state.rate_limiter.record_success(&ip);
            value
        }
        Err(error) => {
            state.rate_limiter.record_failure(&ip);
            return Err(error);
        }
    };

    state.notifier.notify_joined(&user.name, &user.email).await;

    Ok(Json(JoinResponse {
        session_token,
        private_key: key_pair.private_key_openssh,
        public_key: key_pair.public_key_openssh,
        certificate: cert.as_ref().map(|c| c.certificate_openssh.clone()),
        ca_enabled: state.ca.is_enabled(),
        valid_until: cert.as_ref().map(|c| c.valid_before),
    }))
}
