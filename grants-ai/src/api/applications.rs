//! Enriched application listing
//!
//! Served entirely from the cache; a request never reaches the indexer or
//! the classifier.

use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::models::EnrichedApplication;
use crate::AppState;

/// GET /api/applications
///
/// Classified applications across every configured round, sorted by title.
/// Responds 503 `CACHE_MISS` until every round has been fetched once.
pub async fn list_applications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EnrichedApplication>>> {
    let applications = state.assembler.assemble().await?;
    Ok(Json(applications))
}

pub fn application_routes() -> Router<AppState> {
    Router::new().route("/api/applications", get(list_applications))
}
