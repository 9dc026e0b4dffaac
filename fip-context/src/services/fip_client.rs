//! FIP live API client
//!
//! Reads the song currently on air from `GET {fip_api}/live`. A webradio is
//! selected with the `webradio` query parameter; without it the main station
//! is used.
//!
//! Payload fields read:
//! - `now.firstLine.title`: song title (required)
//! - `now.song.interpreters`: credited performers
//! - `now.secondLine.title`: performer line, used when `interpreters` is absent

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::types::{NowPlayingError, NowPlayingSource, Track};

const USER_AGENT: &str = concat!("fip-context/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct LiveResponse {
    now: Option<NowBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NowBlock {
    first_line: Option<Line>,
    second_line: Option<Line>,
    song: Option<SongBlock>,
}

#[derive(Debug, Deserialize)]
struct Line {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SongBlock {
    interpreters: Option<Vec<String>>,
}

/// Now-playing source backed by the FIP live API
pub struct FipClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl FipClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, NowPlayingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| NowPlayingError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: api_url.into(),
        })
    }

    fn live_url(&self) -> String {
        format!("{}/live", self.api_url.trim_end_matches('/'))
    }

    pub async fn current_song(&self, station: Option<&str>) -> Result<Track, NowPlayingError> {
        let url = self.live_url();
        debug!(url = %url, station = station.unwrap_or(""), "Fetching current FIP song");

        let mut request = self.http_client.get(&url);
        if let Some(station) = station.filter(|s| !s.is_empty()) {
            request = request.query(&[("webradio", station)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NowPlayingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NowPlayingError::Transport(format!("HTTP {}", status)));
        }

        let live: LiveResponse = response
            .json()
            .await
            .map_err(|e| NowPlayingError::BadResponse(e.to_string()))?;

        let track = to_track(live)?;
        debug!(
            title = %track.title,
            performers = track.performers.len(),
            "Current FIP song"
        );
        Ok(track)
    }
}

#[async_trait]
impl NowPlayingSource for FipClient {
    async fn current(&self, station: Option<&str>) -> Result<Track, NowPlayingError> {
        self.current_song(station).await
    }
}

fn to_track(live: LiveResponse) -> Result<Track, NowPlayingError> {
    let now = live
        .now
        .ok_or_else(|| NowPlayingError::BadResponse("missing `now` block".to_string()))?;

    let title = now
        .first_line
        .and_then(|line| line.title)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| NowPlayingError::BadResponse("missing song title".to_string()))?;

    let performers = match now.song.and_then(|song| song.interpreters) {
        Some(interpreters) => interpreters,
        None => now
            .second_line
            .and_then(|line| line.title)
            .into_iter()
            .collect(),
    };
    let performers = performers
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    Ok(Track::new(title, performers))
}
