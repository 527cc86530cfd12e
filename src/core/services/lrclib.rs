use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::track::TrackInfo;
use crate::error::{ConfigError, FetchError, LyricSyncError};

const USER_AGENT: &str = concat!("lyricsync/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_ERROR_BODY: usize = 512;

/// One (artist, title, album, duration) tuple sent to the lyric service.
/// An empty album and a zero duration mean "not specified".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TrackQuery {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub duration_secs: u64,
}

impl TrackQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_duration(mut self, duration_secs: u64) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("artist_name", self.artist.clone()),
            ("track_name", self.title.clone()),
        ];
        if !self.album.is_empty() {
            params.push(("album_name", self.album.clone()));
        }
        if self.duration_secs > 0 {
            params.push(("duration", self.duration_secs.to_string()));
        }
        params
    }
}

impl From<&TrackInfo> for TrackQuery {
    fn from(track: &TrackInfo) -> Self {
        Self {
            artist: track.artist.clone(),
            title: track.title.clone(),
            album: track.album.clone().unwrap_or_default(),
            duration_secs: track.duration_secs.unwrap_or(0),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LrclibResponse {
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

impl LrclibResponse {
    /// A body with neither lyric text nor the instrumental flag is "no match".
    pub fn has_content(&self) -> bool {
        let present = |text: &Option<String>| text.as_deref().is_some_and(|t| !t.is_empty());
        self.instrumental || present(&self.plain_lyrics) || present(&self.synced_lyrics)
    }
}

/// A remote source of lyrics, queried one candidate at a time.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn fetch(&self, query: &TrackQuery) -> Result<LrclibResponse, FetchError>;
}

#[derive(Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl LrclibClient {
    /// `endpoint` is the full lookup URL, e.g. `https://lrclib.net/api/get`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, LyricSyncError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            field: "lrclib_url".to_string(),
            value: format!("{} ({})", endpoint, e),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow::Error::new(e).context("failed to create HTTP client"))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LyricsSource for LrclibClient {
    async fn fetch(&self, query: &TrackQuery) -> Result<LrclibResponse, FetchError> {
        debug!("GET {} with {:?}", self.endpoint, query.query_params());

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query.query_params())
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await.map_err(transport_error)?;
                serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
            }
            StatusCode::NOT_FOUND => Err(FetchError::NotFound),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(FetchError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(MAX_ERROR_BODY).collect(),
                })
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}
