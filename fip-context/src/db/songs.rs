//! Song persistence
//!
//! Every successfully enriched track is stored in the `songs` table. The
//! performer and genre lists are kept as JSON arrays in TEXT columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fip_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::types::Track;

/// A track as stored, with its generated id and creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSong {
    pub id: i64,
    pub title: String,
    pub performers: Vec<String>,
    pub genres: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistence sink for enriched tracks
#[async_trait]
pub trait SongStore: Send + Sync {
    /// Store a completed track; assigns `id` and `created_at`
    async fn save(&self, track: &Track) -> Result<StoredSong>;

    /// Latest stored songs, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<StoredSong>>;
}

/// `SongStore` on the service's SQLite pool
#[derive(Clone)]
pub struct SqliteSongStore {
    pool: SqlitePool,
}

impl SqliteSongStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongStore for SqliteSongStore {
    async fn save(&self, track: &Track) -> Result<StoredSong> {
        let performers: Vec<String> = track.performers.clone();
        let genres: Vec<String> = track.genres.iter().cloned().collect();
        let created_at = Utc::now();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO songs (title, interpreters, genres, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&track.title)
        .bind(serde_json::to_string(&performers)?)
        .bind(serde_json::to_string(&genres)?)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(id, title = %track.title, genres = genres.len(), "Song stored");

        Ok(StoredSong {
            id,
            title: track.title.clone(),
            performers,
            genres,
            created_at,
        })
    }

    async fn recent(&self, limit: u32) -> Result<Vec<StoredSong>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, interpreters, genres, created_at
            FROM songs
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<StoredSong> {
                let interpreters: String = row.try_get("interpreters")?;
                let genres: String = row.try_get("genres")?;

                Ok(StoredSong {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    performers: serde_json::from_str(&interpreters)?,
                    genres: serde_json::from_str(&genres)?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        // One connection so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        fip_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    fn enriched(title: &str, performers: &[&str], genres: &[&str]) -> Track {
        let mut track = Track::new(title, performers.iter().map(|s| s.to_string()).collect());
        track.genres = genres.iter().map(|s| s.to_string()).collect();
        track
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_timestamp() {
        let store = SqliteSongStore::new(setup_test_db().await);
        let before = Utc::now();

        let stored = store
            .save(&enriched("So What", &["Miles Davis"], &["Jazz", "Bebop"]))
            .await
            .unwrap();

        assert!(stored.id > 0);
        assert_eq!(stored.title, "So What");
        assert_eq!(stored.performers, vec!["Miles Davis"]);
        assert_eq!(stored.genres, vec!["Bebop", "Jazz"]);
        assert!(stored.created_at >= before);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_first() {
        let store = SqliteSongStore::new(setup_test_db().await);

        let first = store.save(&enriched("One", &["A"], &["Rock"])).await.unwrap();
        let second = store.save(&enriched("Two", &["B"], &[])).await.unwrap();
        let third = store.save(&enriched("Three", &[], &["Pop"])).await.unwrap();

        let recent = store.recent(10).await.unwrap();

        let ids: Vec<i64> = recent.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(recent[0].title, "Three");
        assert!(recent[0].performers.is_empty());
        assert_eq!(recent[1].performers, vec!["B"]);
        assert!(recent[1].genres.is_empty());
        assert_eq!(recent[2].genres, vec!["Rock"]);
    }

    #[tokio::test]
    async fn test_recent_honors_limit() {
        let store = SqliteSongStore::new(setup_test_db().await);
        for i in 0..5 {
            store
                .save(&enriched(&format!("Song {}", i), &["X"], &["Jazz"]))
                .await
                .unwrap();
        }

        let recent = store.recent(2).await.unwrap();

        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].title, "Song 4");
        assert_eq!(recent[1].title, "Song 3");
    }

    #[tokio::test]
    async fn test_recent_on_empty_table() {
        let store = SqliteSongStore::new(setup_test_db().await);
        assert!(store.recent(20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_without_schema_is_database_error() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteSongStore::new(pool);

        let err = store
            .save(&enriched("Lost", &["Nobody"], &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, fip_common::Error::Database(_)));
    }
}
