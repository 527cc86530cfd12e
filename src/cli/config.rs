use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::env::EnvParser;
use crate::config::Config as AppConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the effective configuration to the config file
    Save {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Reset configuration file to defaults
    Reset,
}

pub async fn execute(args: ConfigArgs, config: &AppConfig) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            println!("{}", config.to_toml()?.trim_end());

            let overrides = EnvParser::get_all_vars();
            if !overrides.is_empty() {
                println!("\n# set in the environment:");
                for (name, value) in overrides {
                    println!("# {}={}", name, value);
                }
            }
        }

        ConfigCommands::Path => {
            let config_path = AppConfig::config_path()?;
            println!("{}", config_path.display());
        }

        ConfigCommands::Save { force } => {
            let config_path = AppConfig::config_path()?;
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            config.save(&config_path)?;
            println!("✅ Configuration saved to {}", config_path.display());
        }

        ConfigCommands::Reset => {
            let config_path = AppConfig::config_path()?;
            AppConfig::default().save(&config_path)?;
            println!("✅ Configuration reset to defaults");
            println!("📁 Config file: {}", config_path.display());
        }
    }

    Ok(())
}
