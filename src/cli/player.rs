use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::sync::Arc;
use tracing::debug;

use crate::core::player::mpris::{list_players, session_bus, MprisSurface};
use crate::core::player::TrackObserver;
use crate::services::SimpleServices;
use crate::utils::format::format_duration;

#[derive(Args)]
pub struct PlayerArgs {
    #[command(subcommand)]
    command: PlayerCommands,
}

#[derive(Subcommand)]
enum PlayerCommands {
    /// List MPRIS players on the session bus
    List,

    /// Show the track currently playing
    Current,

    /// Test the connection to a player and show what it reports
    Test {
        /// MPRIS service to test (defaults to the configured one)
        #[arg(long)]
        service: Option<String>,
    },
}

pub async fn execute(args: PlayerArgs, services: &SimpleServices) -> Result<()> {
    match args.command {
        PlayerCommands::List => {
            let connection = session_bus().await?;
            let players = list_players(&connection).await.context("failed to list D-Bus names")?;

            if players.is_empty() {
                println!("No MPRIS players found");
                println!("\nCheck that your music player is running and supports MPRIS");
                return Ok(());
            }

            println!("Found {} MPRIS player(s):\n", players.len());
            for player in &players {
                match &player.identity {
                    Some(identity) => println!("  {} ({})", player.service, identity),
                    None => println!("  {}", player.service),
                }
            }
            println!("\nUse --mpris-service to choose which player to follow");
        }

        PlayerCommands::Current => {
            let config = services.config();
            let surface = MprisSurface::connect(&config.mpris_service)
                .await
                .context("failed to connect to player")?;
            let (observer, _events) = TrackObserver::new(Arc::new(surface));

            if let Err(e) = observer.poll().await {
                println!("No track currently playing ({})", e);
                return Ok(());
            }

            let state = observer.get_state();
            let Some(track) = state.track.filter(|t| t.is_valid()) else {
                println!("No track currently playing");
                return Ok(());
            };

            println!("title:    {}", track.title);
            println!("artist:   {}", track.artist);
            if let Some(album) = &track.album {
                println!("album:    {}", album);
            }
            if let Some(duration) = track.duration_secs {
                println!("duration: {}", format_duration(duration as i64));
            }
            if let Some(artwork) = &track.artwork_url {
                println!("artwork:  {}", artwork);
            }
            if state.playing {
                println!("state:    playing");
                println!("position: {}", format_duration(state.position_secs));
            } else {
                println!("state:    paused");
            }
        }

        PlayerCommands::Test { service } => {
            let config = services.config();
            let service = service.unwrap_or_else(|| config.mpris_service.clone());
            println!("Testing connection to: {}\n", service);

            let surface = MprisSurface::connect(&service)
                .await
                .context("failed to connect to player")?;
            match surface.identity().await {
                Ok(Some(identity)) => println!("player identity: {}", identity),
                Ok(None) => {}
                Err(e) => debug!("No identity for {}: {}", surface.service(), e),
            }

            let (observer, _events) = TrackObserver::new(Arc::new(surface));
            let polled = observer.poll().await;
            println!("status: connected ✓\n");

            let state = observer.get_state();
            match state.track.filter(|t| polled.is_ok() && t.is_valid()) {
                Some(track) => {
                    println!("current track:");
                    println!("  title:  {}", track.title);
                    println!("  artist: {}", track.artist);
                    if let Some(album) = &track.album {
                        println!("  album:  {}", album);
                    }
                    println!("  state:  {}", if state.playing { "playing" } else { "paused" });
                }
                None => println!("no track currently playing"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        player: PlayerArgs,
    }

    #[test]
    fn test_test_subcommand_takes_optional_service() {
        let cli = TestCli::try_parse_from(["lyricsync", "test", "--service", "org.mpris.MediaPlayer2.mpv"]).unwrap();
        assert!(matches!(
            cli.player.command,
            PlayerCommands::Test { service: Some(ref s) } if s == "org.mpris.MediaPlayer2.mpv"
        ));

        let cli = TestCli::try_parse_from(["lyricsync", "test"]).unwrap();
        assert!(matches!(cli.player.command, PlayerCommands::Test { service: None }));

        assert!(TestCli::try_parse_from(["lyricsync", "test", "--service"]).is_err());
    }
}
