// ABOUTME: GET/POST /api/mfa/setup — TOTP enrollment (§10.5)
// ABOUTME: Secrets are encrypted at rest with the master key; never returned after confirmation

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::errors::{AppError, AppResult};
use crate::middleware::{ClientIp, UserIdentity};
use crate::model::AuditAction;
use crate::state::AppState;

const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

fn build_totp(account_name: &str, secret_bytes: Vec<u8>) -> AppResult<TOTP> {
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret_bytes,
        Some("keyforge".to_string()),
        account_name.to_string(),
    )
    .map_err(AppError::internal)
}

/// Response body for `GET /api/mfa/setup`.
#[derive(Debug, Serialize)]
pub struct MfaSetupResponse {
    /// Base32-encoded TOTP secret, shown once.
    pub secret: String,
    /// `otpauth://` URL suitable for a QR code.
    pub otpauth_url: String,
}

/// `GET /api/mfa/setup`. Begin enrollment.
///
/// # Errors
/// Returns `AppError::Conflict` if MFA is already enabled for the caller.
pub async fn setup_begin(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
    ClientIp(ip): ClientIp,
) -> AppResult<Json<MfaSetupResponse>> {
    if user.mfa_enabled {
        return Err(AppError::conflict("MFA is already enabled for this account"));
    }

    let secret = Secret::generate_secret();
    let base32_secret = secret.to_encoded().to_string();
    let secret_bytes = secret.to_bytes().map_err(AppError::internal)?;
    let totp = build_totp(&user.name, secret_bytes)?;
    let otpauth_url = totp.get_url();

    let encrypted = state.master_key.encrypt(base32_secret.as_bytes())?;
    state.store.set_pending_mfa_secret(&user.name, &encrypted).await?;
    state
        .store
        .append_audit(&user.name, AuditAction::MfaSetup, "MFA enrollment started", &ip)
        .await?;

    Ok(Json(MfaSetupResponse {
        secret: base32_secret,
        otpauth_url,
    }))
}

/// Request body for `POST /api/mfa/setup`.
#[derive(Debug, Deserialize)]
pub struct MfaConfirmRequest {
    /// The 6-digit TOTP code from the user's authenticator app.
    pub code: String,
}

/// Response body for `POST /api/mfa/setup`.
#[derive(Debug, Serialize)]
pub struct MfaConfirmResponse {
    /// Always true; a wrong code returns an error instead.
    pub mfa_enabled: bool,
}

/// `POST /api/mfa/setup`. Confirm enrollment with a TOTP code.
///
/// # Errors
/// Returns `AppError::InvalidInput` if no enrollment is pending or the code
/// does not verify.
pub async fn setup_confirm(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
    ClientIp(ip): ClientIp,
    Json(request): Json<MfaConfirmRequest>,
) -> AppResult<Json<MfaConfirmResponse>> {
    let pending = user
        .mfa_secret
        .as_deref()
        .ok_or_else(|| AppError::invalid_input("no MFA enrollment is pending"))?;
    let base32_secret = String::from_utf8(state.master_key.decrypt(pending)?).map_err(AppError::internal)?;
    let secret_bytes = Secret::Encoded(base32_secret).to_bytes().map_err(AppError::internal)?;
    let totp = build_totp(&user.name, secret_bytes)?;

    let valid = totp.check_current(&request.code).map_err(AppError::internal)?;
    if !valid {
        return Err(AppError::invalid_input("TOTP code did not verify"));
    }

    state.store.confirm_mfa(&user.name).await?;
    state
        .store
        .append_audit(&user.name, AuditAction::MfaVerify, "MFA enrollment confirmed", &ip)
        .await?;

    Ok(Json(MfaConfirmResponse { mfa_enabled: true }))
}
