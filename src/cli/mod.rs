//! Command Line Interface module
//!
//! One submodule per top-level command:
//! - `run`: follow the player and print the current lyric line (default)
//! - `player`: discover MPRIS players and show what is playing
//! - `lyrics`: look up, pre-fetch and preview lyrics
//! - `cache`: inspect and maintain the lyric cache
//! - `config`: show the effective configuration

pub mod cache;
pub mod config;
pub mod lyrics;
pub mod player;
pub mod run;

use clap::Args;

use crate::config::Config;
use crate::core::services::catalog::find_similar;
use crate::core::infrastructure::cache::DiskCache;
use crate::error::Result;

/// Flags that override the loaded configuration for a single invocation.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// MPRIS service name (e.g. org.mpris.MediaPlayer2.spotify)
    #[arg(short = 'm', long, global = true)]
    pub mpris_service: Option<String>,

    /// Custom LRCLIB lookup URL
    #[arg(long, global = true)]
    pub lrclib_url: Option<String>,

    /// Sync offset in seconds added to the playback position
    #[arg(short = 's', long, global = true, allow_negative_numbers = true)]
    pub sync_offset: Option<f64>,

    /// Disable cache reads (always fetch fresh)
    #[arg(long, global = true)]
    pub no_cache: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(service) = &self.mpris_service {
            config.mpris_service = service.clone();
        }
        if let Some(url) = &self.lrclib_url {
            config.lrclib_url = url.clone();
        }
        if let Some(offset) = self.sync_offset {
            config.sync_offset = offset;
        }
        if self.no_cache {
            config.no_cache = true;
        }
        config.validate()
    }
}

/// Print "did you mean" suggestions from the cache to stderr. Returns whether any were shown.
pub(crate) fn print_suggestions(cache: &DiskCache, artist: &str, title: &str, heading: &str) -> bool {
    let entries = cache.list_all().unwrap_or_default();
    let suggestions = find_similar(&entries, artist, title);
    if suggestions.is_empty() {
        return false;
    }

    eprintln!("{}\n", heading);
    eprintln!("did you mean one of these?");
    for entry in suggestions {
        eprintln!("  {} - {}", entry.artist_name, entry.track_name);
    }
    true
}
