// Ports - Interface definitions (contracts)

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Callback receiving an engine run's completed fraction in `[0, 1]`
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Port for the transcoding engine and its scratch file namespace
#[async_trait]
pub trait EnginePort: Send + Sync {
    /// Make the engine ready to accept runs
    async fn load(&self) -> Result<(), DomainError>;

    /// Forward engine log output
    fn set_logging(&self, enabled: bool);

    /// Replace the progress callback used by subsequent runs
    fn set_progress(&self, callback: Option<ProgressFn>);

    /// Run the engine with the given argument tokens
    async fn run(&self, args: &[String]) -> Result<(), DomainError>;

    /// Write a file into the engine's file namespace
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), DomainError>;

    /// Read a file from the engine's file namespace
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, DomainError>;

    /// Remove a file from the engine's file namespace
    async fn unlink(&self, name: &str) -> Result<(), DomainError>;
}

/// A file handed to the probe, by value
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeFile {
    pub name: String,
    pub data: Arc<[u8]>,
}

impl ProbeFile {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Port for media metadata probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Container name, duration and per-stream dimensions
    async fn get_file_info(&self, file: ProbeFile) -> Result<FileInfo, DomainError>;

    /// Description of the frame at `frame` (zero based) in the first video stream
    async fn get_frames(&self, file: ProbeFile, frame: u64) -> Result<FrameInfo, DomainError>;

    /// Drop any state left behind by a failed request
    async fn clean_up(&self) -> Result<(), DomainError>;
}

/// Port for the interactive crop box
pub trait CropWidget: Send + Sync {
    /// Current rectangle in source pixel space
    fn get_data(&self) -> CropInfo;

    /// Constrain the box to an aspect ratio
    fn set_aspect_ratio(&self, ratio: AspectRatio);

    fn aspect_ratio(&self) -> AspectRatio;

    /// Release the widget; must be idempotent
    fn destroy(&self);

    fn is_destroyed(&self) -> bool;
}

static NEXT_CROPPER_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to an attached crop widget, compared by identity
#[derive(Clone)]
pub struct CropperHandle {
    id: u64,
    widget: Arc<dyn CropWidget>,
}

impl CropperHandle {
    pub fn new(widget: Arc<dyn CropWidget>) -> Self {
        Self {
            id: NEXT_CROPPER_ID.fetch_add(1, Ordering::Relaxed),
            widget,
        }
    }

    pub fn get_data(&self) -> CropInfo {
        self.widget.get_data()
    }

    pub fn set_aspect_ratio(&self, ratio: AspectRatio) {
        self.widget.set_aspect_ratio(ratio);
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.widget.aspect_ratio()
    }

    pub fn destroy(&self) {
        self.widget.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.widget.is_destroyed()
    }
}

impl PartialEq for CropperHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for CropperHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CropperHandle")
            .field("id", &self.id)
            .field("aspect_ratio", &self.widget.aspect_ratio())
            .finish()
    }
}

/// Port for logging and observability
#[async_trait]
pub trait LogPort: Send + Sync {
    async fn info(&self, message: &str);

    async fn warn(&self, message: &str);

    async fn error(&self, message: &str);

    async fn debug(&self, message: &str);
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
