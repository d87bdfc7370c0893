//! FFprobe adapter for media file probing
//!
//! Each request stages the bytes in a temporary file (containers with a
//! trailing index cannot be probed from a pipe) and parses ffprobe's JSON.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::adapters::probe_worker::ProbeBackend;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::ProbeFile;

/// Top-level ffprobe JSON output (`-show_format -show_streams`)
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// ffprobe `-show_frames` output
#[derive(Debug, Deserialize)]
struct FfprobeFrames {
    #[serde(default)]
    frames: Vec<FfprobeFrame>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFrame {
    best_effort_timestamp_time: Option<String>,
    pts_time: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    key_frame: Option<u8>,
}

/// FFprobe-based probe backend
pub struct FfprobeBackend {
    binary: PathBuf,
}

impl FfprobeBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Write the request bytes to a temporary file carrying the original extension
    fn stage(file: &ProbeFile) -> Result<NamedTempFile, DomainError> {
        let suffix = Path::new(&file.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut staged = tempfile::Builder::new()
            .prefix("sticker-probe-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| DomainError::FsFail(format!("Failed to stage probe input: {}", e)))?;
        staged
            .write_all(&file.data)
            .map_err(|e| DomainError::FsFail(format!("Failed to stage probe input: {}", e)))?;
        Ok(staged)
    }

    async fn run_json(&self, args: &[&str], path: &Path) -> Result<String, DomainError> {
        let output = Command::new(&self.binary)
            .args(["-v", "error", "-print_format", "json"])
            .args(args)
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                DomainError::ProbeFailed(format!("{}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(DomainError::ProbeFailed(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ProbeBackend for FfprobeBackend {
    async fn file_info(&self, file: &ProbeFile) -> Result<FileInfo, DomainError> {
        let staged = Self::stage(file)?;
        let json = self
            .run_json(&["-show_format", "-show_streams"], staged.path())
            .await?;
        let info = parse_file_info(&json)?;
        debug!(name = %file.name, format = %info.name, duration = info.duration, "Probed file");
        Ok(info)
    }

    async fn frame(&self, file: &ProbeFile, index: u64) -> Result<FrameInfo, DomainError> {
        let staged = Self::stage(file)?;
        let interval = format!("%+#{}", index + 1);
        let json = self
            .run_json(
                &[
                    "-select_streams",
                    "v:0",
                    "-read_intervals",
                    interval.as_str(),
                    "-show_frames",
                    "-show_entries",
                    "frame=best_effort_timestamp_time,pts_time,width,height,key_frame",
                ],
                staged.path(),
            )
            .await?;
        parse_frame(&json, index)
    }

    async fn reset(&self) {
        // Staged files are removed when their handles drop; nothing persists between requests
        debug!("Probe backend reset");
    }
}

fn seconds_to_micros(value: &str) -> Option<Micros> {
    let seconds = value.trim().parse::<f64>().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| (seconds * MICROS_PER_SECOND).round() as Micros)
}

fn parse_file_info(json: &str) -> Result<FileInfo, DomainError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| DomainError::ProbeFailed(format!("Failed to parse ffprobe output: {}", e)))?;
    let format = output
        .format
        .ok_or_else(|| DomainError::ProbeFailed("ffprobe reported no format".to_string()))?;

    let streams = output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .filter_map(|s| match (s.width, s.height) {
            (Some(width), Some(height)) => Some(StreamInfo { width, height }),
            _ => None,
        })
        .collect();

    Ok(FileInfo {
        name: format.format_name.unwrap_or_default(),
        duration: format
            .duration
            .as_deref()
            .and_then(seconds_to_micros)
            .unwrap_or(0),
        streams,
    })
}

fn parse_frame(json: &str, index: u64) -> Result<FrameInfo, DomainError> {
    let output: FfprobeFrames = serde_json::from_str(json)
        .map_err(|e| DomainError::ProbeFailed(format!("Failed to parse ffprobe output: {}", e)))?;
    let frame = output
        .frames
        .get(index as usize)
        .ok_or_else(|| DomainError::ProbeFailed(format!("Frame {} not found", index)))?;

    let timestamp = frame
        .best_effort_timestamp_time
        .as_deref()
        .or(frame.pts_time.as_deref())
        .and_then(seconds_to_micros)
        .unwrap_or(0);

    Ok(FrameInfo {
        index,
        timestamp,
        width: frame.width.unwrap_or(0),
        height: frame.height.unwrap_or(0),
        key_frame: frame.key_frame == Some(1),
    })
}
