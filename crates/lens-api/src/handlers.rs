//! Request handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use lens_models::SessionDescription;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Handle a session offer: negotiate a new peer session and return the
/// answer. On failure no session remains registered.
pub async fn handle_offer(
    State(state): State<AppState>,
    Json(offer): Json<SessionDescription>,
) -> ApiResult<Json<SessionDescription>> {
    if offer.sdp.trim().is_empty() {
        return Err(ApiError::bad_request("offer has an empty sdp"));
    }

    info!(kind = %offer.kind, "received session offer");
    let answer = state.manager.create_session(offer).await?;
    info!("sending answer back to client");

    Ok(Json(answer))
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub sessions: usize,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        sessions: state.manager.session_count().await,
    })
}
