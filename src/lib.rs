//! Sticker CLI Library
//!
//! Turns video clips into animated WebM stickers: trim, optional crop, speed
//! change, and a VP9 re-encode into a 512px box, driven through an external
//! ffmpeg engine with ffprobe for metadata.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{AppContainer, DefaultAppContainer, StickerController};
pub use domain::errors::{DomainError, Phase};
pub use domain::model::{ConversionStatus, ConvertSetting, CropInfo, OutputFile, VideoInfo};
pub use domain::store::{Action, AppState};
pub use error::{StickerError, StickerResult};
