//! Genre enrichment of the current track
//!
//! Two fan-out stages run back to back:
//! 1. every performer -> canonical identifier (identity resolver)
//! 2. every distinct identifier -> genre labels (genre fetcher)
//!
//! A failure in either stage fails the whole enrichment. Partial genre sets
//! are never attached to the track.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::services::fan_out::FanOut;
use crate::types::{
    GenreFactFetcher, IdentityResolver, PerformerIdentity, ResolveError, Track, UpstreamError,
};

pub struct EnrichmentOrchestrator {
    resolver: Arc<dyn IdentityResolver>,
    fetcher: Arc<dyn GenreFactFetcher>,
    fan_out: FanOut,
}

impl EnrichmentOrchestrator {
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        fetcher: Arc<dyn GenreFactFetcher>,
        fan_out: FanOut,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            fan_out,
        }
    }

    /// Attach the deduplicated genres of every performer to `track`
    pub async fn enrich(&self, mut track: Track) -> Result<Track, UpstreamError> {
        let identifiers = self.resolve_performers(&track.performers).await?;
        info!(
            title = %track.title,
            performers = track.performers.len(),
            identifiers = identifiers.len(),
            "Performers resolved"
        );

        let genres = self.fetch_genres(identifiers).await?;
        info!(title = %track.title, genres = genres.len(), "Genres fetched");

        track.genres = genres.into_iter().collect();
        Ok(track)
    }

    /// Distinct identifiers of every performer
    async fn resolve_performers(
        &self,
        performers: &[String],
    ) -> Result<HashSet<String>, UpstreamError> {
        let resolver = &self.resolver;
        let outcome = self
            .fan_out
            .run_all(performers.iter().cloned(), |name: String| async move {
                let identifier = resolver.resolve(&name).await?;
                Ok::<_, ResolveError>(Some(PerformerIdentity { name, identifier }))
            })
            .await;

        if let Some(error) = outcome.error {
            return Err(UpstreamError::Resolution(error));
        }

        Ok(outcome
            .results
            .into_iter()
            .map(|identity| {
                debug!(performer = %identity.name, identifier = %identity.identifier, "Identity");
                identity.identifier
            })
            .collect())
    }

    async fn fetch_genres(&self, identifiers: HashSet<String>) -> Result<HashSet<String>, UpstreamError> {
        let fetcher = &self.fetcher;
        let outcome = self
            .fan_out
            .run_all(identifiers, |identifier: String| async move {
                fetcher.genres_for(&identifier).await
            })
            .await;

        match outcome.error {
            Some(error) => Err(UpstreamError::GenreLookup(error)),
            None => Ok(outcome.results),
        }
    }
}
