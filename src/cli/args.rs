//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use clap_num::number_range;

use crate::domain::model::*;
use crate::utils::time::TimeParser;

/// Upper bound accepted for `--bitrate`, in kbps
const MAX_BITRATE_KBPS: u32 = 100_000;

fn parse_time(s: &str) -> Result<Micros, String> {
    TimeParser::parse_micros(s).map_err(|e| e.to_string())
}

fn parse_fps(s: &str) -> Result<u32, String> {
    number_range(s, MIN_FPS, MAX_FPS)
}

fn parse_bitrate(s: &str) -> Result<u32, String> {
    number_range(s, 1, MAX_BITRATE_KBPS)
}

fn parse_speed(s: &str) -> Result<f64, String> {
    let speed: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(speed)
    } else {
        Err(format!("must be between {} and {}", MIN_SPEED, MAX_SPEED))
    }
}

fn parse_crop(s: &str) -> Result<CropInfo, String> {
    CropInfo::parse(s).map_err(|e| e.to_string())
}

fn parse_aspect(s: &str) -> Result<AspectRatio, String> {
    s.parse::<AspectRatio>().map_err(|e| e.to_string())
}

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the sticker
    #[arg(short, long, default_value = "output.webm")]
    pub output: PathBuf,

    /// Trim start (seconds, MM:SS.ms or HH:MM:SS.ms)
    #[arg(short, long, value_parser = parse_time)]
    pub start: Option<Micros>,

    /// Trim end (default: end of the video)
    #[arg(short, long, value_parser = parse_time)]
    pub end: Option<Micros>,

    /// Playback speed multiplier (0.0625 - 16)
    #[arg(long, value_parser = parse_speed)]
    pub speed: Option<f64>,

    /// Output frame rate (1 - 30)
    #[arg(long, value_parser = parse_fps)]
    pub fps: Option<u32>,

    /// Target bitrate in kbps
    #[arg(long, value_parser = parse_bitrate)]
    pub bitrate: Option<u32>,

    /// Crop rectangle, WIDTHxHEIGHT+X+Y in source pixels
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<CropInfo>,

    /// Constrain the crop box (custom, square, 16:9, 4:3)
    #[arg(long, value_parser = parse_aspect)]
    pub aspect: Option<AspectRatio>,

    /// Report progress as JSON lines on stdout
    #[arg(long)]
    pub json_progress: bool,

    /// Replace the output file if it exists
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}

impl ConvertArgs {
    /// Settings given on the command line; the trim range needs the probed duration
    pub fn settings_patch(&self, duration: Micros) -> ConvertSettingPatch {
        let mut patch = ConvertSettingPatch::new();
        patch.speed = self.speed;
        patch.fps = self.fps;
        patch.bitrate = self.bitrate;
        if self.start.is_some() || self.end.is_some() {
            patch.time = Some((self.start.unwrap_or(0), self.end.unwrap_or(duration)));
        }
        patch
    }
}

/// Output format for inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    Yaml,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Also describe this frame (zero based) of the first video stream
    #[arg(long)]
    pub frame: Option<u64>,
}

/// Arguments for the commands (dry run) command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Name of the uploaded source file
    #[arg(short, long)]
    pub input: String,

    /// Trim start
    #[arg(short, long, value_parser = parse_time, default_value = "0")]
    pub start: Micros,

    /// Trim end
    #[arg(short, long, value_parser = parse_time)]
    pub end: Micros,

    /// Crop rectangle, WIDTHxHEIGHT+X+Y in source pixels
    #[arg(long, value_parser = parse_crop)]
    pub crop: CropInfo,

    /// Playback speed multiplier (0.0625 - 16)
    #[arg(long, value_parser = parse_speed)]
    pub speed: Option<f64>,

    /// Output frame rate (1 - 30)
    #[arg(long, value_parser = parse_fps)]
    pub fps: Option<u32>,

    /// Target bitrate in kbps
    #[arg(long, value_parser = parse_bitrate)]
    pub bitrate: Option<u32>,

    /// Print the argument lists as JSON
    #[arg(long)]
    pub json: bool,
}
