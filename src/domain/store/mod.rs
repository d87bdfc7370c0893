//! Application state tree and its transition function
//!
//! `reduce` never touches its input: it clones the previous tree (blobs are
//! shared through `Arc`) and returns the next one.

use crate::domain::model::*;
use crate::ports::CropperHandle;

/// Engine lifecycle flags
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineState {
    pub init: bool,
}

/// Crop widget attachment
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CropperState {
    pub enabled: bool,
    pub cropper: Option<CropperHandle>,
}

/// Conversion progress
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvertorState {
    pub convert_status: ConversionStatus,
    /// Overall fraction, `[0, 0.5]` while trimming and `[0.5, 1]` while encoding
    pub progress: f64,
    /// Message of the last failed phase
    pub error: Option<String>,
}

/// The whole application state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub engine: EngineState,
    pub cropper: CropperState,
    pub input_file: InputFile,
    pub output_file: Option<OutputFile>,
    pub video_editor_config: ConvertSetting,
    pub convertor: ConvertorState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded with settings other than the built-in defaults
    pub fn with_settings(setting: ConvertSetting) -> Self {
        Self {
            video_editor_config: setting,
            ..Self::default()
        }
    }

    /// Overall progress as a whole percentage for display
    pub fn progress_percent(&self) -> u32 {
        (self.convertor.progress * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// Named state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    EngineReady,
    CropEnable(CropperHandle),
    CropDisable,
    InputMetadataSet(VideoInfo),
    InputLoaded(MediaBlob),
    TrimPhaseStart,
    EncodePhaseStart,
    Progress(f64),
    ConversionFinished,
    ConversionFailed(String),
    OutputLoaded(MediaBlob),
    TrimTimeSet((Micros, Micros)),
    SettingsMerge(ConvertSettingPatch),
    Reset,
}

impl Action {
    /// Wrap raw input bytes
    pub fn input_loaded(data: Vec<u8>) -> Self {
        Action::InputLoaded(MediaBlob::new(data, None))
    }

    /// Wrap encoded sticker bytes
    pub fn output_loaded(data: Vec<u8>) -> Self {
        Action::OutputLoaded(MediaBlob::new(data, Some("video/webm")))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::EngineReady => "engine-ready",
            Action::CropEnable(_) => "crop-enable",
            Action::CropDisable => "crop-disable",
            Action::InputMetadataSet(_) => "input-metadata-set",
            Action::InputLoaded(_) => "input-loaded",
            Action::TrimPhaseStart => "trim-phase-start",
            Action::EncodePhaseStart => "encode-phase-start",
            Action::Progress(_) => "progress",
            Action::ConversionFinished => "conversion-finished",
            Action::ConversionFailed(_) => "conversion-failed",
            Action::OutputLoaded(_) => "output-loaded",
            Action::TrimTimeSet(_) => "trim-time-set",
            Action::SettingsMerge(_) => "settings-merge",
            Action::Reset => "reset",
        }
    }
}

/// Apply `action` to `state`, returning the next state
pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();

    match action {
        Action::EngineReady => {
            next.engine.init = true;
        }
        Action::CropEnable(handle) => {
            next.cropper.enabled = true;
            next.cropper.cropper = Some(handle);
        }
        Action::CropDisable => {
            next.cropper.enabled = false;
            next.cropper.cropper = None;
        }
        Action::InputMetadataSet(info) => {
            next.input_file.video_info = info;
            next.video_editor_config.time = (0, info.duration);
        }
        Action::InputLoaded(blob) => {
            next.input_file.file_loaded = true;
            next.input_file.blob = Some(blob);
        }
        Action::TrimPhaseStart => {
            next.convertor.convert_status = ConversionStatus::ConvertingTrim;
            next.convertor.progress = 0.0;
            next.convertor.error = None;
        }
        Action::EncodePhaseStart => {
            next.convertor.convert_status = ConversionStatus::ConvertingEncode;
            next.convertor.progress = 0.5;
        }
        Action::Progress(fraction) => match next.convertor.convert_status {
            ConversionStatus::ConvertingTrim => next.convertor.progress = fraction,
            ConversionStatus::ConvertingEncode => next.convertor.progress = fraction + 0.5,
            // late callbacks after a phase ended are dropped
            _ => {}
        },
        Action::ConversionFinished => {
            next.convertor.convert_status = ConversionStatus::Converted;
            next.convertor.progress = 1.0;
        }
        Action::ConversionFailed(message) => {
            next.convertor.convert_status = ConversionStatus::Failed;
            next.convertor.error = Some(message);
        }
        Action::OutputLoaded(blob) => {
            next.output_file = Some(OutputFile::from_blob(blob));
        }
        Action::TrimTimeSet(time) => {
            next.video_editor_config.time = time;
        }
        Action::SettingsMerge(patch) => {
            next.video_editor_config.merge(&patch);
        }
        Action::Reset => {
            next.convertor.convert_status = ConversionStatus::Idle;
            next.convertor.progress = 0.0;
            next.convertor.error = None;
        }
    }

    next
}

#[cfg(test)]
mod tests;
