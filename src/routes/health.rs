// ABOUTME: Liveness endpoint, unauthenticated (§4.8)

use axum::Json;
use serde_json::{json, Value};

/// `GET /health`. Always `200 {"status":"healthy"}` once the process is serving.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
