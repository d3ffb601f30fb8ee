//! Manual refresh trigger

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub status: &'static str,
}

/// POST /api/refresh
///
/// Wakes the refresh loop for an immediate cycle.
pub async fn trigger_refresh(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<RefreshAccepted>)> {
    let orchestrator = state
        .refresh
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("refresh is disabled".to_string()))?;

    if !orchestrator.trigger_now() {
        return Err(ApiError::Conflict(
            "a refresh cycle is already running".to_string(),
        ));
    }

    tracing::info!("Refresh requested via API");

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted { status: "accepted" }),
    ))
}

pub fn refresh_routes() -> Router<AppState> {
    Router::new().route("/api/refresh", post(trigger_refresh))
}
