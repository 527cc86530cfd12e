use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod config;
mod core;
mod error;
mod services;
mod signal_handler;
mod utils;

use cli::*;
use config::Config;
use error::{LyricSyncError, Result};
use services::SimpleServices;
use signal_handler::SignalHandler;

#[derive(Parser)]
#[command(name = "lyricsync")]
#[command(about = "Show synchronized lyrics for the track playing in an MPRIS player")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the player and print lyrics in time (default)
    Run,

    /// Discover players and show what is playing
    Player(player::PlayerArgs),

    /// Look up and preview lyrics
    Lyrics(lyrics::LyricsArgs),

    /// Manage the lyric cache
    Cache(cache::CacheArgs),

    /// Show configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The viewer prints lyrics to the terminal; logs would interleave with them
    let viewer = matches!(cli.command, None | Some(Commands::Run));
    utils::logging::init_logging(cli.verbose, viewer && !cli.verbose)?;

    // Load configuration, then let flags win
    let mut config = Config::load(cli.config.as_deref())?;
    cli.overrides.apply(&mut config)?;

    let services = SimpleServices::new(config);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let shutdown = SignalHandler::new();
            let _monitor = shutdown
                .start_signal_monitoring()
                .map_err(|e| LyricSyncError::Internal(e.into()))?;
            run::execute(&services, shutdown).await
        }
        Commands::Player(args) => player::execute(args, &services).await,
        Commands::Lyrics(args) => lyrics::execute(args, &services).await,
        Commands::Cache(args) => cache::execute(args, &services).await,
        Commands::Config(args) => cli::config::execute(args, &services.config()).await,
    }
    .map_err(LyricSyncError::Internal)
}
