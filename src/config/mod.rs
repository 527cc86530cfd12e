//! Configuration
//!
//! Load order, lowest priority first:
//! - built-in defaults
//! - TOML file (`--config <path>` or the per-user config directory)
//! - `.env` file and environment variables
//! - command-line flags, applied by the CLI on top of the loaded value

pub mod env;
pub mod validation;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use env::{EnvParser, EnvVars};
use validation::ConfigValidator;

pub const DEFAULT_MPRIS_SERVICE: &str = "org.mpris.MediaPlayer2.spotify";
pub const DEFAULT_LRCLIB_URL: &str = "https://lrclib.net/api/get";

pub const HTTP_TIMEOUT_RANGE: (u64, u64) = (1, 120);
pub const POLL_INTERVAL_RANGE: (u64, u64) = (10, 5000);
pub const SYNC_OFFSET_LIMIT: f64 = 600.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// D-Bus name of the MPRIS player to follow
    pub mpris_service: String,

    /// Full URL of the LRCLIB lookup endpoint
    pub lrclib_url: String,

    /// Seconds added to the playback position before picking a lyric line
    pub sync_offset: f64,

    /// Deadline for a single lyrics request
    pub http_timeout_secs: u64,

    pub poll_interval_ms: u64,

    /// Directory holding one cache file per song
    pub cache_dir: PathBuf,

    /// Always fetch fresh lyrics (results are still cached)
    pub no_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mpris_service: DEFAULT_MPRIS_SERVICE.to_string(),
            lrclib_url: DEFAULT_LRCLIB_URL.to_string(),
            sync_offset: 0.0,
            http_timeout_secs: 10,
            poll_interval_ms: 100,
            cache_dir: default_cache_dir(),
            no_cache: false,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "lyricsync")
}

fn default_cache_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.cache_dir().join("lyrics"),
        None => {
            warn!("ProjectDirs unavailable; falling back to current directory for cache path");
            PathBuf::from(".lyricsync").join("lyrics")
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        // Try to load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let mut config = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }
                .into());
            }
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        // Environment variables have the highest priority
        config.load_from_env()?;
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Ok(toml::from_str(&content)?)
    }

    fn load_from_env(&mut self) -> Result<()> {
        if let Some(service) = EnvParser::parse_string(EnvVars::MPRIS_SERVICE)? {
            self.mpris_service = service;
        }

        if let Some(url) = EnvParser::parse_string(EnvVars::LRCLIB_URL)? {
            ConfigValidator::validate_url(&url, EnvVars::LRCLIB_URL)?;
            self.lrclib_url = url;
        }

        if let Some(offset) = EnvParser::parse_f64(EnvVars::SYNC_OFFSET, -SYNC_OFFSET_LIMIT, SYNC_OFFSET_LIMIT)? {
            self.sync_offset = offset;
        }

        let (min, max) = HTTP_TIMEOUT_RANGE;
        if let Some(timeout) = EnvParser::parse_u64(EnvVars::HTTP_TIMEOUT, min, max)? {
            self.http_timeout_secs = timeout;
        }

        let (min, max) = POLL_INTERVAL_RANGE;
        if let Some(interval) = EnvParser::parse_u64(EnvVars::POLL_INTERVAL_MS, min, max)? {
            self.poll_interval_ms = interval;
        }

        if let Some(dir) = EnvParser::parse_path(EnvVars::CACHE_DIR)? {
            self.cache_dir = dir;
        }

        if let Some(no_cache) = EnvParser::parse_bool(EnvVars::NO_CACHE)? {
            self.no_cache = no_cache;
        }

        Ok(())
    }

    /// Check every field, whichever layer it came from.
    pub fn validate(&self) -> Result<()> {
        if self.mpris_service.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mpris_service".to_string(),
                value: "(empty)".to_string(),
            }
            .into());
        }
        ConfigValidator::validate_url(&self.lrclib_url, "lrclib_url")?;
        ConfigValidator::validate_range(self.http_timeout_secs, HTTP_TIMEOUT_RANGE.0, HTTP_TIMEOUT_RANGE.1, "http_timeout_secs")?;
        ConfigValidator::validate_range(self.poll_interval_ms, POLL_INTERVAL_RANGE.0, POLL_INTERVAL_RANGE.1, "poll_interval_ms")?;
        ConfigValidator::validate_offset(self.sync_offset, SYNC_OFFSET_LIMIT, "sync_offset")?;
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| anyhow::Error::new(e).context("failed to render config").into())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        fs::write(path, self.to_toml()?).map_err(ConfigError::Io)?;
        Ok(())
    }

    fn default_config_path() -> Result<PathBuf> {
        let project_dirs = project_dirs().ok_or(ConfigError::NoProjectDirs)?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Self::default_config_path()
    }
}
