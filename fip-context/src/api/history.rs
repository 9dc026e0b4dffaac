//! Stored song history

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::StoredSong;
use crate::error::ApiResult;
use crate::AppState;

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

impl HistoryQuery {
    /// Requested limit clamped to `1..=MAX_HISTORY_LIMIT`
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

/// GET /history?limit=N
///
/// Latest stored songs, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<StoredSong>>> {
    let songs = state.store.recent(query.effective_limit()).await?;
    Ok(Json(songs))
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route("/history", get(get_history))
}
