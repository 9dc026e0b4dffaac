//! Current song endpoint
//!
//! `GET /current?from=<station>` fetches the song on air, enriches it with
//! the performers' genres, stores it and returns the stored record.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::db::StoredSong;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CurrentQuery {
    /// Webradio name; empty or absent means the main station
    #[serde(default)]
    pub from: Option<String>,
}

/// GET /current
pub async fn get_current(
    State(state): State<AppState>,
    Query(query): Query<CurrentQuery>,
) -> ApiResult<Json<StoredSong>> {
    match current_song(&state, query.from.as_deref()).await {
        Ok(song) => {
            *state.last_error.write().await = None;
            Ok(Json(song))
        }
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            Err(e)
        }
    }
}

async fn current_song(state: &AppState, station: Option<&str>) -> ApiResult<StoredSong> {
    let station = station.filter(|s| !s.is_empty());

    let track = state
        .now_playing
        .current(station)
        .await
        .map_err(|e| ApiError::Upstream(e.into()))?;

    let track = state.enricher.enrich(track).await?;
    let song = state.store.save(&track).await?;

    info!(
        id = song.id,
        title = %song.title,
        station = station.unwrap_or("fip"),
        genres = song.genres.len(),
        "Current song enriched"
    );

    Ok(song)
}

/// Build current song routes
pub fn current_routes() -> Router<AppState> {
    Router::new().route("/current", get(get_current))
}
