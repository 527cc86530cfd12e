//! Error handling for the lyricsync application
//!
//! This module provides a hierarchical error system. Each concern (player
//! observation, cache, remote retrieval, configuration) has its own typed
//! error, and all of them fold into `LyricSyncError` at the application edge.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LyricSyncError {
    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Lyrics retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures while talking to the playback-control surface. Both variants are
/// non-fatal for a polling caller, which simply retries on the next tick.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Player unreachable: {0}")]
    Connection(String),

    #[error("Bad property {property}: {reason}")]
    Property { property: String, reason: String },

    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),
}

impl From<zbus::fdo::Error> for PlayerError {
    fn from(err: zbus::fdo::Error) -> Self {
        PlayerError::Bus(err.into())
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache miss")]
    Miss,

    #[error("cache expired")]
    Expired,

    #[error("cache corrupt")]
    Corrupt,

    #[error("Invalid cache key: artist and title are required")]
    InvalidKey,

    #[error("File cache error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// Outcome of a single request against the remote lyric service.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("status 404: lyrics not found")]
    NotFound,

    #[error("lrclib returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode lrclib json: {0}")]
    Decode(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Timeout => true,
            FetchError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("{0}")]
    Validation(String),

    #[error("lyrics server took too long to respond")]
    Timeout,

    #[error("no lyrics found for {artist} - {title}: {last_error}")]
    NotFound {
        artist: String,
        title: String,
        last_error: String,
    },

    #[error("lyrics lookup cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid config format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Could not determine project directories")]
    NoProjectDirs,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LyricSyncError>;

impl From<std::io::Error> for LyricSyncError {
    fn from(err: std::io::Error) -> Self {
        LyricSyncError::Cache(CacheError::Io(err))
    }
}

impl From<toml::de::Error> for LyricSyncError {
    fn from(err: toml::de::Error) -> Self {
        LyricSyncError::Config(ConfigError::InvalidFormat(err))
    }
}

impl From<zbus::Error> for LyricSyncError {
    fn from(err: zbus::Error) -> Self {
        LyricSyncError::Player(PlayerError::Bus(err))
    }
}
