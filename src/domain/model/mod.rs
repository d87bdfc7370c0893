// Domain models - Core types and data structures

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Microseconds, the unit every timestamp in the store is kept in
pub type Micros = u64;

pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Fps bounds accepted by the settings form
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 30;

/// Playback multiplier bounds
pub const MIN_SPEED: f64 = 0.0625;
pub const MAX_SPEED: f64 = 16.0;

pub const DEFAULT_BITRATE_KBPS: u32 = 1200;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Basic facts about a loaded input, as reported by the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in microseconds
    pub duration: Micros,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Create new video info with validation
    pub fn new(duration: Micros, width: u32, height: u32) -> Result<Self, DomainError> {
        if width == 0 || height == 0 {
            return Err(DomainError::ProbeFailed(
                "Video dimensions cannot be zero".to_string(),
            ));
        }
        Ok(Self {
            duration,
            width,
            height,
        })
    }

    /// Crop rectangle covering the whole frame
    pub fn full_frame(&self) -> CropInfo {
        CropInfo {
            width: self.width as f64,
            height: self.height as f64,
            x: 0.0,
            y: 0.0,
        }
    }

    /// Get aspect ratio
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// User-adjustable conversion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvertSetting {
    /// Target video bitrate in kbps
    pub bitrate: u32,
    pub fps: u32,
    /// Playback multiplier applied to the clip
    pub speed: f64,
    /// Trim range `[start, end]` in microseconds
    pub time: (Micros, Micros),
}

impl Default for ConvertSetting {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE_KBPS,
            fps: DEFAULT_FPS,
            speed: DEFAULT_SPEED,
            time: (0, 0),
        }
    }
}

impl ConvertSetting {
    /// Length of the trimmed range in source time
    pub fn clip_duration(&self) -> Micros {
        self.time.1.saturating_sub(self.time.0)
    }

    /// Length of the clip once played back at `speed`
    pub fn playback_duration(&self) -> f64 {
        self.clip_duration() as f64 / self.speed
    }

    /// Copy every field present in `patch` over this setting
    pub fn merge(&mut self, patch: &ConvertSettingPatch) {
        if let Some(bitrate) = patch.bitrate {
            self.bitrate = bitrate;
        }
        if let Some(fps) = patch.fps {
            self.fps = fps;
        }
        if let Some(speed) = patch.speed {
            self.speed = speed;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
    }
}

/// Partial settings update, as produced by one form edit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvertSettingPatch {
    pub bitrate: Option<u32>,
    pub fps: Option<u32>,
    pub speed: Option<f64>,
    pub time: Option<(Micros, Micros)>,
}

impl ConvertSettingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn time(mut self, start: Micros, end: Micros) -> Self {
        self.time = Some((start, end));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bitrate.is_none() && self.fps.is_none() && self.speed.is_none() && self.time.is_none()
    }
}

/// Crop rectangle in source pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropInfo {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl CropInfo {
    pub fn new(width: f64, height: f64, x: f64, y: f64) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// Parse `WxH+X+Y` (offsets optional)
    pub fn parse(geometry: &str) -> Result<Self, DomainError> {
        let bad = || {
            DomainError::BadArgs(format!(
                "Invalid crop '{}'. Expected WIDTHxHEIGHT or WIDTHxHEIGHT+X+Y",
                geometry
            ))
        };

        let mut parts = geometry.trim().split('+');
        let size = parts.next().ok_or_else(bad)?;
        let (w, h) = size.split_once(['x', 'X']).ok_or_else(bad)?;
        let width: f64 = w.parse().map_err(|_| bad())?;
        let height: f64 = h.parse().map_err(|_| bad())?;

        let x: f64 = match parts.next() {
            Some(v) => v.parse().map_err(|_| bad())?,
            None => 0.0,
        };
        let y: f64 = match parts.next() {
            Some(v) => v.parse().map_err(|_| bad())?,
            None => 0.0,
        };
        if parts.next().is_some() || [width, height, x, y].iter().any(|v| !v.is_finite()) {
            return Err(bad());
        }
        if width <= 0.0 || height <= 0.0 || x < 0.0 || y < 0.0 {
            return Err(bad());
        }

        Ok(Self::new(width, height, x, y))
    }
}

impl fmt::Display for CropInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Conversion lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionStatus {
    #[default]
    Idle,
    ConvertingTrim,
    ConvertingEncode,
    Converted,
    Failed,
}

impl ConversionStatus {
    pub fn is_converting(&self) -> bool {
        matches!(
            self,
            ConversionStatus::ConvertingTrim | ConversionStatus::ConvertingEncode
        )
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConversionStatus::Idle => "idle",
            ConversionStatus::ConvertingTrim => "convertingTrim",
            ConversionStatus::ConvertingEncode => "convertingEncode",
            ConversionStatus::Converted => "converted",
            ConversionStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

static NEXT_BLOB_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory media bytes plus the handle used to refer to them
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBlob {
    pub data: Arc<[u8]>,
    pub mime: Option<String>,
    /// Opaque `blob:` locator, unique per blob within the process
    pub src: String,
}

impl MediaBlob {
    pub fn new(data: Vec<u8>, mime: Option<&str>) -> Self {
        let id = NEXT_BLOB_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            data: Arc::from(data),
            mime: mime.map(str::to_string),
            src: format!("blob:sticker/{}", id),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Loaded input file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputFile {
    pub file_loaded: bool,
    pub video_info: VideoInfo,
    pub blob: Option<MediaBlob>,
}

impl InputFile {
    pub fn video_src(&self) -> Option<&str> {
        self.blob.as_ref().map(|b| b.src.as_str())
    }
}

/// Result of one successful conversion
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// Size in bytes
    pub file_size: u64,
    pub video_src: String,
    pub blob: MediaBlob,
}

impl OutputFile {
    pub fn from_blob(blob: MediaBlob) -> Self {
        Self {
            file_size: blob.size(),
            video_src: blob.src.clone(),
            blob,
        }
    }

    /// Size shown on the download button, in KB rounded up
    pub fn size_kb(&self) -> u64 {
        self.file_size.div_ceil(1000)
    }
}

/// Crop box aspect ratio presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Custom,
    Square,
    Widescreen,
    Standard,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Custom,
        AspectRatio::Square,
        AspectRatio::Widescreen,
        AspectRatio::Standard,
    ];

    /// Width over height; `None` leaves the box unconstrained
    pub fn value(&self) -> Option<f64> {
        match self {
            AspectRatio::Custom => None,
            AspectRatio::Square => Some(1.0),
            AspectRatio::Widescreen => Some(16.0 / 9.0),
            AspectRatio::Standard => Some(4.0 / 3.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Custom => "Custom",
            AspectRatio::Square => "Square",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Standard => "4:3",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "custom" | "free" => Ok(AspectRatio::Custom),
            "square" | "1:1" => Ok(AspectRatio::Square),
            "16:9" => Ok(AspectRatio::Widescreen),
            "4:3" => Ok(AspectRatio::Standard),
            other => Err(DomainError::BadArgs(format!(
                "Invalid aspect ratio: {}. Valid values: custom, square, 16:9, 4:3",
                other
            ))),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What the upload surface hands over
#[derive(Debug, Clone, PartialEq)]
pub enum UploadPayload {
    File { name: String, data: Vec<u8> },
    Text(String),
}

impl UploadPayload {
    pub fn file(name: impl Into<String>, data: Vec<u8>) -> Self {
        UploadPayload::File {
            name: name.into(),
            data,
        }
    }
}

/// Metadata returned by the probe for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Container format name
    pub name: String,
    /// Duration in microseconds
    pub duration: Micros,
    pub streams: Vec<StreamInfo>,
}

impl FileInfo {
    /// Reduce to the facts the store keeps, from the first stream
    pub fn video_info(&self) -> Result<VideoInfo, DomainError> {
        let stream = self
            .streams
            .first()
            .ok_or_else(|| DomainError::ProbeFailed("No streams found".to_string()))?;
        VideoInfo::new(self.duration, stream.width, stream.height)
    }
}

/// Per-stream dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
}

/// A single decoded frame's description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub index: u64,
    /// Presentation time in microseconds
    pub timestamp: Micros,
    pub width: u32,
    pub height: u32,
    pub key_frame: bool,
}
