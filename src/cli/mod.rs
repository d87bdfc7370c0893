//! CLI module for the sticker converter
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;
pub mod view;

pub use args::{ConvertArgs, InspectArgs, PlanArgs, ReportFormat};

/// Sticker converter
///
/// Trims, crops and re-encodes a video clip into a 512px VP9 WebM with alpha,
/// the format messaging platforms accept as animated stickers.
#[derive(Parser, Debug)]
#[command(name = "sticker")]
#[command(about = "Turn video clips into animated WebM stickers")]
#[command(version)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (default: ./sticker.toml, then $XDG_CONFIG_HOME/sticker/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ffmpeg binary to run
    #[arg(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe binary to run
    #[arg(long, global = true)]
    pub ffprobe: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a video into a sticker
    Convert(ConvertArgs),
    /// Inspect video file information
    Inspect(InspectArgs),
    /// Print the engine commands a conversion would run, without running them
    #[command(name = "commands")]
    Plan(PlanArgs),
}
