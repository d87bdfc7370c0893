// Business rules - Sticker limits, trim and settings validation

use crate::domain::errors::*;
use crate::domain::model::*;

/// Platform limit on sticker file size, in bytes
pub const STICKER_SIZE_LIMIT: u64 = 256_000;

/// Platform limit on sticker playback length, in microseconds
pub const STICKER_DURATION_LIMIT: f64 = 3_000_000.0;

/// Non-blocking warnings shown next to the convert and download actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StickerWarning {
    /// Playback length at the chosen speed exceeds the platform limit
    TooLong,
    /// Encoded file is larger than the platform limit
    TooLarge,
}

impl StickerWarning {
    pub fn message(&self) -> &'static str {
        match self {
            StickerWarning::TooLong => "Video sticker has video length limit: 3 seconds",
            StickerWarning::TooLarge => "Video sticker has file size limit: 256KB",
        }
    }
}

/// Sticker limit checks
pub struct StickerLimits;

impl StickerLimits {
    /// Warn when the clip plays longer than the limit at the chosen speed
    pub fn check_duration(setting: &ConvertSetting) -> Option<StickerWarning> {
        (setting.playback_duration() > STICKER_DURATION_LIMIT).then_some(StickerWarning::TooLong)
    }

    /// Warn when the encoded output exceeds the size limit
    pub fn check_size(file_size: u64) -> Option<StickerWarning> {
        (file_size > STICKER_SIZE_LIMIT).then_some(StickerWarning::TooLarge)
    }
}

/// Validation of user-supplied settings before they reach the store
pub struct SettingsValidator;

impl SettingsValidator {
    /// Trim range must satisfy `start <= end <= duration`
    pub fn validate_trim(
        time: (Micros, Micros),
        video_info: &VideoInfo,
    ) -> Result<(), DomainError> {
        let (start, end) = time;
        if start > end {
            return Err(DomainError::BadArgs(format!(
                "Trim start ({}) must not be after end ({})",
                start, end
            )));
        }
        if end > video_info.duration {
            return Err(DomainError::BadArgs(format!(
                "Trim end ({}) exceeds video duration ({})",
                end, video_info.duration
            )));
        }
        Ok(())
    }

    pub fn validate_patch(patch: &ConvertSettingPatch) -> Result<(), DomainError> {
        if let Some(fps) = patch.fps {
            if !(MIN_FPS..=MAX_FPS).contains(&fps) {
                return Err(DomainError::BadArgs(format!(
                    "FPS must be between {} and {}, got {}",
                    MIN_FPS, MAX_FPS, fps
                )));
            }
        }
        if let Some(speed) = patch.speed {
            if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
                return Err(DomainError::BadArgs(format!(
                    "Speed must be between {} and {}, got {}",
                    MIN_SPEED, MAX_SPEED, speed
                )));
            }
        }
        if patch.bitrate == Some(0) {
            return Err(DomainError::BadArgs("Bitrate must be positive".to_string()));
        }
        Ok(())
    }
}

/// Container sniffing for uploaded bytes
pub struct ContainerSniffer;

impl ContainerSniffer {
    /// ISO base media files (mp4/mov/m4v) open with an `ftyp` box
    pub fn is_mp4(data: &[u8]) -> bool {
        data.len() >= 12 && &data[4..8] == b"ftyp"
    }
}
