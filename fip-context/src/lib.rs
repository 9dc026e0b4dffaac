//! fip-context library interface
//!
//! Enriches the song playing on FIP with its performers' musical genres,
//! resolved through Wikipedia and DBpedia, and stores every enriched song.

pub mod api;
pub mod db;
pub mod error;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::db::SongStore;
use crate::services::EnrichmentOrchestrator;
use crate::types::NowPlayingSource;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Source of the song currently on air
    pub now_playing: Arc<dyn NowPlayingSource>,
    /// Genre enrichment pipeline
    pub enricher: Arc<EnrichmentOrchestrator>,
    /// Sink for enriched songs
    pub store: Arc<dyn SongStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last `/current` failure, reported by `/health`
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        now_playing: Arc<dyn NowPlayingSource>,
        enricher: Arc<EnrichmentOrchestrator>,
        store: Arc<dyn SongStore>,
    ) -> Self {
        Self {
            now_playing,
            enricher,
            store,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::current_routes())
        .merge(api::history_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
