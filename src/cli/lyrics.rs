use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::print_suggestions;
use crate::core::lyrics::{format_timestamp, parse_synced};
use crate::core::services::lrclib::TrackQuery;
use crate::core::services::resolver::LyricData;
use crate::services::SimpleServices;

#[derive(Args)]
pub struct LyricsArgs {
    #[command(subcommand)]
    command: LyricsCommands,
}

#[derive(Subcommand)]
enum LyricsCommands {
    /// Look up lyrics on LRCLIB and show what is available
    Search(SongArgs),

    /// Pre-fetch lyrics into the cache
    Fetch(SongArgs),

    /// Print lyrics with timestamps
    Preview(SongArgs),
}

#[derive(Args)]
struct SongArgs {
    artist: String,
    title: String,

    /// Album name (helps with matching)
    #[arg(short = 'l', long)]
    album: Option<String>,

    /// Duration in seconds (helps with matching)
    #[arg(short, long)]
    duration: Option<u64>,
}

impl SongArgs {
    fn query(&self) -> TrackQuery {
        let mut query = TrackQuery::new(&self.artist, &self.title);
        if let Some(album) = &self.album {
            query = query.with_album(album);
        }
        if let Some(duration) = self.duration {
            query = query.with_duration(duration);
        }
        query
    }
}

pub async fn execute(args: LyricsArgs, services: &SimpleServices) -> Result<()> {
    let resolver = services.create_resolver()?;
    let cache = services.cache();

    match args.command {
        LyricsCommands::Search(song) => {
            println!("Searching for: {} - {}\n", song.artist, song.title);

            let data = resolver.resolve(&song.query()).await.context("lyrics not found")?;

            println!("Found lyrics ({}):", data.origin.as_str());
            println!("  track:        {}", data.track_name);
            println!("  artist:       {}", data.artist_name);
            if !data.album_name.is_empty() {
                println!("  album:        {}", data.album_name);
            }
            if data.duration > 0.0 {
                println!("  duration:     {:.0}s", data.duration);
            }
            println!("  instrumental: {}", data.instrumental);
            println!("  synced lines: {}", line_count(&data.synced_lyrics));
            println!("  plain lines:  {}", line_count(&data.plain_lyrics));
        }

        LyricsCommands::Fetch(song) => {
            if let Ok(cached) = cache.get(&song.artist, &song.title) {
                if !services.config().no_cache {
                    println!("'{} - {}' is already cached", song.artist, song.title);
                    if cached.sync_offset != 0.0 {
                        println!("sync offset: {:.2}s", cached.sync_offset);
                    }
                    return Ok(());
                }
            }

            println!("Fetching: {} - {}", song.artist, song.title);
            let data = resolver.resolve(&song.query()).await.context("failed to fetch lyrics")?;

            if data.instrumental {
                println!("Cached: {} - {} (instrumental)", data.artist_name, data.track_name);
            } else if data.has_synced() {
                println!("Cached: {} - {}, synced lyrics available", data.artist_name, data.track_name);
            } else {
                println!(
                    "Cached: {} - {}, only plain lyrics available (no timing)",
                    data.artist_name, data.track_name
                );
            }
        }

        LyricsCommands::Preview(song) => {
            let data = match resolver.resolve(&song.query()).await {
                Ok(data) => data,
                Err(e) => {
                    if print_suggestions(&cache, &song.artist, &song.title, "Lyrics not found online") {
                        anyhow::bail!("{}", e);
                    }
                    return Err(e).context("lyrics not found");
                }
            };
            print_preview(&data);
        }
    }

    Ok(())
}

fn line_count(text: &str) -> String {
    if text.is_empty() {
        "none".to_string()
    } else {
        text.lines().count().to_string()
    }
}

fn print_preview(data: &LyricData) {
    println!("({})\n", data.origin.as_str());
    println!("{} - {}", data.artist_name, data.track_name);
    if !data.album_name.is_empty() {
        println!("{}", data.album_name);
    }
    println!("{}", "─".repeat(60));

    if data.instrumental {
        println!("\n[instrumental]");
        return;
    }

    if data.has_synced() {
        let lines = parse_synced(&data.synced_lyrics);
        if lines.is_empty() {
            println!("\nno valid synced lyrics found");
            return;
        }

        println!("\nsynced lyrics ({} lines):\n", lines.len());
        for line in &lines {
            println!("[{}] {}", format_timestamp(line.time_secs), line.text);
        }
        if data.sync_offset != 0.0 {
            println!("\nsync offset: {:.2}s", data.sync_offset);
        }
    } else if !data.plain_lyrics.is_empty() {
        println!("\nplain lyrics (no timestamps):\n");
        println!("{}", data.plain_lyrics);
    } else {
        println!("\nno lyrics available");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_args_query() {
        let song = SongArgs {
            artist: "Band".to_string(),
            title: "Song".to_string(),
            album: Some("LP".to_string()),
            duration: None,
        };
        assert_eq!(song.query(), TrackQuery::new("Band", "Song").with_album("LP"));
    }

    #[test]
    fn test_line_count() {
        assert_eq!(line_count(""), "none");
        assert_eq!(line_count("a\nb\nc"), "3");
    }
}
