use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::io::{self, BufRead, Write};
use tracing::info;

use crate::cli::print_suggestions;
use crate::core::services::catalog::{sort_entries, SortOrder};
use crate::services::SimpleServices;
use crate::utils::format::{format_bytes, format_epoch};

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommands,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache statistics
    Stats,

    /// List all cached songs
    List {
        /// Sort order
        #[arg(long, value_enum, default_value_t = SortOrder::Date)]
        sort: SortOrder,
    },

    /// Show the cached entry for a song
    Show { artist: String, title: String },

    /// Remove all cached entries
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        confirm: bool,
    },

    /// Remove expired and unreadable entries
    Prune,

    /// Remove one song from the cache
    Delete { artist: String, title: String },

    /// Store a sync offset (seconds) for a cached song
    Offset {
        artist: String,
        title: String,
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },
}

pub async fn execute(args: CacheArgs, services: &SimpleServices) -> Result<()> {
    let cache = services.cache();

    match args.command {
        CacheCommands::Stats => {
            let stats = cache.stats().context("failed to get cache stats")?;
            let location = cache
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(memory only)".to_string());

            println!("Cache statistics:");
            println!("  location: {}", location);
            println!("  entries:  {}", stats.total_entries);
            println!("  size:     {}", format_bytes(stats.size_bytes));
        }

        CacheCommands::List { sort } => {
            let mut entries = cache.list_all().context("failed to list cache")?;
            if entries.is_empty() {
                println!("Cache is empty");
                return Ok(());
            }
            sort_entries(&mut entries, sort);

            let artist_width = column_width(entries.iter().map(|e| e.artist_name.as_str()), "ARTIST");
            let title_width = column_width(entries.iter().map(|e| e.track_name.as_str()), "TITLE");

            println!(
                "{:<aw$}  {:<tw$}  {:<11}  CACHED",
                "ARTIST",
                "TITLE",
                "SYNC OFFSET",
                aw = artist_width,
                tw = title_width
            );
            for entry in &entries {
                let offset = if entry.sync_offset == 0.0 {
                    "-".to_string()
                } else {
                    format!("{:.1}s", entry.sync_offset)
                };
                println!(
                    "{:<aw$}  {:<tw$}  {:<11}  {}",
                    entry.artist_name,
                    entry.track_name,
                    offset,
                    format_epoch(entry.created_at, "%Y-%m-%d"),
                    aw = artist_width,
                    tw = title_width
                );
            }
            println!("\nTotal: {} songs", entries.len());
        }

        CacheCommands::Show { artist, title } => {
            let entry = match cache.get(&artist, &title) {
                Ok(entry) => entry,
                Err(e) => {
                    if print_suggestions(&cache, &artist, &title, "Song not found in cache") {
                        anyhow::bail!("no cached entry for {} - {}", artist, title);
                    }
                    return Err(e).context("song not found in cache");
                }
            };

            println!("artist:       {}", entry.artist_name);
            println!("title:        {}", entry.track_name);
            println!("album:        {}", entry.album_name);
            println!("duration:     {:.1}s", entry.duration);
            println!("sync offset:  {:.2}s", entry.sync_offset);
            println!("instrumental: {}", entry.instrumental);
            println!("cached:       {}", format_epoch(entry.created_at, "%Y-%m-%d %H:%M:%S"));
            println!("expires:      {}", format_epoch(entry.expires_at, "%Y-%m-%d %H:%M:%S"));

            if !entry.synced_lyrics.is_empty() {
                println!("\nsynced lyrics: {} lines", entry.synced_lyrics.lines().count());
            } else if !entry.plain_lyrics.is_empty() {
                println!("\nplain lyrics: {} lines (no sync data)", entry.plain_lyrics.lines().count());
            } else {
                println!("\nno lyrics available");
            }
        }

        CacheCommands::Clear { confirm } => {
            if !confirm && !ask_confirmation("Are you sure you want to clear the whole cache? (y/n): ")? {
                println!("Cancelled");
                return Ok(());
            }

            info!("Clearing cache...");
            cache.clear().context("failed to clear cache")?;
            println!("✅ Cache cleared successfully!");
        }

        CacheCommands::Prune => {
            let removed = cache.prune().context("failed to prune cache")?;
            println!("Removed {} expired entries", removed);
        }

        CacheCommands::Delete { artist, title } => {
            if cache.get(&artist, &title).is_err() {
                if print_suggestions(&cache, &artist, &title, "Song not found in cache") {
                    anyhow::bail!("no cached entry for {} - {}", artist, title);
                }
                anyhow::bail!("song not found in cache");
            }

            cache.delete(&artist, &title).context("failed to delete from cache")?;
            println!("Deleted '{} - {}' from cache", artist, title);
        }

        CacheCommands::Offset { artist, title, seconds } => {
            crate::config::validation::ConfigValidator::validate_offset(
                seconds,
                crate::config::SYNC_OFFSET_LIMIT,
                "offset",
            )?;

            let entry = match cache.update_offset(&artist, &title, seconds) {
                Ok(entry) => entry,
                Err(e) => {
                    print_suggestions(&cache, &artist, &title, "Song not found in cache");
                    return Err(e).context("cannot set offset");
                }
            };
            println!(
                "Sync offset for '{} - {}' set to {:.2}s",
                entry.artist_name, entry.track_name, entry.sync_offset
            );
        }
    }

    Ok(())
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values
        .map(|v| v.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(header.len())
}

fn ask_confirmation(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().lock().read_line(&mut response)?;
    Ok(is_yes(&response))
}

fn is_yes(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "y" | "yes")
}
