//! Core Types and Trait Definitions for fip-context
//!
//! Defines the track record that flows through the service, the collaborator
//! traits the enrichment pipeline depends on, and the error taxonomy of each
//! upstream.
//!
//! # Pipeline
//! - Now-playing source -> `Track` with performers, no genres
//! - `IdentityResolver` -> canonical Wikipedia page identifier per performer
//! - `GenreFactFetcher` -> DBpedia genre labels per identifier
//! - Orchestrator -> `Track` with genres

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::services::fan_out::AggregateError;

// ============================================================================
// Data Model
// ============================================================================

/// The song currently playing on a station
///
/// Genres are kept in a `BTreeSet` so labels are unique and the JSON output
/// is stable; the order itself carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// Credited performers, in the order the source lists them
    pub performers: Vec<String>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
}

impl Track {
    /// Create a track with no genres yet
    pub fn new(title: impl Into<String>, performers: Vec<String>) -> Self {
        Self {
            title: title.into(),
            performers,
            genres: BTreeSet::new(),
        }
    }
}

/// A performer name paired with its canonical page identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PerformerIdentity {
    pub name: String,
    pub identifier: String,
}

/// One genre relation read from the knowledge graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenreFact {
    pub identifier: String,
    pub label: String,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Resolves a performer display name to a canonical page identifier
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the identifier in URI-safe form (spaces replaced by underscores)
    async fn resolve(&self, name: &str) -> Result<String, ResolveError>;
}

/// Fetches the genre labels attached to a canonical identifier
#[async_trait]
pub trait GenreFactFetcher: Send + Sync {
    /// An identifier with no genre facts yields an empty set, not an error
    async fn genres_for(&self, identifier: &str) -> Result<HashSet<String>, GenreQueryError>;
}

/// Supplies the track currently playing
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    /// `station` selects a webradio; `None` means the main station
    async fn current(&self, station: Option<&str>) -> Result<Track, NowPlayingError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Identity resolution failure
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The corpus has no canonical entry for this name
    #[error("no Wikipedia page found for \"{name}\"")]
    NotFound { name: String },

    /// Connection refused, timeout or non-2xx status
    #[error("Wikipedia API transport error: {0}")]
    Transport(String),

    /// Payload did not have the expected opensearch shape
    #[error("unexpected Wikipedia API response: {0}")]
    BadResponse(String),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

/// Knowledge-graph query failure for one identifier
#[derive(Debug, Error)]
#[error("failed to query DBpedia for {identifier}: {reason}")]
pub struct GenreQueryError {
    pub identifier: String,
    pub reason: String,
}

/// Now-playing fetch failure
#[derive(Debug, Error)]
pub enum NowPlayingError {
    #[error("FIP API transport error: {0}")]
    Transport(String),

    #[error("unexpected FIP API response: {0}")]
    BadResponse(String),
}

/// Failure of the enrichment flow as seen by its caller
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("couldn't get current song: {0}")]
    NowPlaying(#[from] NowPlayingError),

    /// At least one performer could not be resolved
    #[error("couldn't resolve performers: {0}")]
    Resolution(AggregateError<ResolveError>),

    /// At least one identifier's genre query failed
    #[error("couldn't fetch genres: {0}")]
    GenreLookup(AggregateError<GenreQueryError>),
}
