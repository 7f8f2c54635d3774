use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use recon_resolver::IdentityResolver;
use recon_types::{IdentifyRequest, IdentifyResponse};
use serde_json::json;

use crate::error::{ServerError, ServerResult};

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "recon-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Resolve one (email, phoneNumber) observation into its consolidated
/// contact.
///
/// Resolution blocks on store transactions (and on retry backoff), so it
/// runs on the blocking pool.
pub async fn identify_handler(
    State(resolver): State<IdentityResolver>,
    payload: Result<Json<IdentifyRequest>, JsonRejection>,
) -> ServerResult<Json<IdentifyResponse>> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let response = tokio::task::spawn_blocking(move || resolver.identify(request))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(Json(response))
}
