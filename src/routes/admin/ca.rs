// ABOUTME: GET /api/admin/ca — CA status and trust anchor (§4.2, §4.8)

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::middleware::AdminIdentity;
use crate::state::AppState;

/// Response body for `GET /api/admin/ca`.
#[derive(Debug, Serialize)]
pub struct CaStatusResponse {
    /// Whether the CA currently mints certificates.
    pub enabled: bool,
    /// The CA's public key, distributed out-of-band to `TrustedUserCAKeys`.
    pub public_key: String,
    /// Configured certificate validity window, in seconds.
    pub cert_validity_secs: i64,
}

/// `GET /api/admin/ca`.
pub async fn status(State(state): State<AppState>, _admin: AdminIdentity) -> Json<CaStatusResponse> {
    Json(CaStatusResponse {
        enabled: state.ca.is_enabled(),
        public_key: state.ca.public_key().to_string(),
        cert_validity_secs: state.ca.cert_validity().num_seconds(),
    })
}
