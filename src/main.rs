//! Sticker CLI
//!
//! Turns video clips into animated WebM stickers small enough for messaging
//! platforms.
//!
//! # Usage
//!
//! ```bash
//! sticker convert -i clip.mov --start 00:01.5 --end 00:04 --aspect square
//! sticker inspect -i clip.mov --format json
//! sticker commands -i clip.mov --end 3 --crop 480x480+80+0
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use sticker_cli::cli::{commands, Cli, Commands};
use sticker_cli::config_initialization::initialize_configuration_hierarchy;
use sticker_cli::ports::LogLevel;
use sticker_cli::utils::logging::{init_logging, LoggingConfig};
use sticker_cli::DefaultAppContainer;

/// Main entry point for the sticker CLI
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let hierarchy =
        initialize_configuration_hierarchy(&cli).context("Failed to load configuration")?;
    let config = hierarchy.config;

    // Initialize logging
    let level = LogLevel::parse(&config.log.level)?;
    init_logging(&LoggingConfig::new(level, config.log.format))?;

    info!("Starting sticker CLI");
    match &hierarchy.source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    for key in &hierarchy.env_overrides {
        debug!("Environment override: {}", key);
    }

    // Execute the requested command
    match cli.command {
        Commands::Convert(args) => {
            info!("Executing convert command");
            let container = DefaultAppContainer::new(&config)?;
            commands::convert(&container, args).await?;
        }
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            let container = DefaultAppContainer::new(&config)?;
            commands::inspect(&container, args).await?;
        }
        Commands::Plan(args) => {
            info!("Executing commands command");
            commands::plan(&config, args)?;
        }
    }

    info!("Sticker CLI completed successfully");
    Ok(())
}
