// Sticker controller - Owns the store and sequences engine work

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::domain::commands::*;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::domain::store::*;
use crate::ports::*;

/// Message shown for any upload that is not a file
pub const INVALID_UPLOAD: &str = "Invalid file";
/// Message shown when the container cannot be turned into MP4
pub const NORMALIZE_FAILED: &str = "failed to convert file";
/// Message shown when the probe cannot describe the working file
pub const PROBE_FAILED: &str = "failed to read info";

/// Startup options for the controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    /// Settings the store starts from before any input is loaded
    pub settings: ConvertSetting,
    /// Forward engine output to the log
    pub engine_logging: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            settings: ConvertSetting::default(),
            engine_logging: true,
        }
    }
}

/// Root controller
///
/// Every state change goes through `reduce`; the resulting snapshots are
/// published on a watch channel. At most one conversion runs at a time: the
/// Idle check and the move to `ConvertingTrim` happen in one store update.
pub struct StickerController {
    engine: Arc<dyn EnginePort>,
    probe: Arc<dyn ProbePort>,
    log_port: Arc<dyn LogPort>,
    store: Arc<watch::Sender<AppState>>,
    engine_logging: bool,
}

impl StickerController {
    /// Create new controller with injected ports
    pub fn new(
        engine: Arc<dyn EnginePort>,
        probe: Arc<dyn ProbePort>,
        log_port: Arc<dyn LogPort>,
        options: ControllerOptions,
    ) -> Self {
        let (store, _) = watch::channel(AppState::with_settings(options.settings));
        Self {
            engine,
            probe,
            log_port,
            store: Arc::new(store),
            engine_logging: options.engine_logging,
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AppState {
        self.store.borrow().clone()
    }

    /// Receive every state published from now on
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.store.subscribe()
    }

    fn dispatch(&self, action: Action) {
        dispatch(&self.store, action);
    }

    /// Load the engine and mark it ready
    pub async fn init_engine(&self) -> Result<(), DomainError> {
        self.engine.load().await?;
        self.engine.set_logging(self.engine_logging);
        self.dispatch(Action::EngineReady);
        self.log_port.info("Engine ready").await;
        Ok(())
    }

    /// Bring an upload into the engine workspace and describe it
    ///
    /// Non-MP4 containers are normalized first, so the probe only ever sees
    /// MP4 bytes. `input.mp4` and the store keep describing the previous
    /// input until the new one has been probed.
    pub async fn load_input(&self, payload: UploadPayload) -> Result<VideoInfo, DomainError> {
        let (name, data) = match payload {
            UploadPayload::File { name, data } => (name, data),
            UploadPayload::Text(_) => {
                self.log_port.warn("Rejected non-file upload").await;
                return Err(DomainError::InvalidUpload(INVALID_UPLOAD.to_string()));
            }
        };

        let state = self.state();
        if !state.engine.init {
            return Err(DomainError::EngineUnavailable(
                "engine has not been initialised".to_string(),
            ));
        }
        if state.convertor.convert_status.is_converting() {
            return Err(DomainError::Busy("a conversion is in progress".to_string()));
        }

        self.log_port
            .info(&format!("Loading {} ({} bytes)", name, data.len()))
            .await;

        let working = if ContainerSniffer::is_mp4(&data) {
            data
        } else {
            self.normalize(&name, &data).await?
        };
        let video_info = self.probe_input(&working).await?;
        self.engine.write_file(INPUT_FILE, &working).await?;

        // a cropper sized for the previous input no longer fits
        self.disable_crop();
        self.dispatch(Action::InputMetadataSet(video_info));
        self.dispatch(Action::input_loaded(working));

        self.log_port
            .info(&format!(
                "Loaded {}x{}, {} us",
                video_info.width, video_info.height, video_info.duration
            ))
            .await;
        Ok(video_info)
    }

    /// Convert `data` to MP4 in the staging file and hand back the result
    async fn normalize(&self, name: &str, data: &[u8]) -> Result<Vec<u8>, DomainError> {
        let source = source_file_name(name);
        self.engine.write_file(&source, data).await?;

        self.engine.set_progress(Some(Arc::new(|ratio: f64| {
            debug!(ratio, "Normalize progress");
        })));
        let result = self
            .engine
            .run(&CommandBuilder::normalize(&source, STAGED_FILE))
            .await;
        self.engine.set_progress(None);

        if let Err(e) = self.engine.unlink(&source).await {
            debug!(error = %e, "Failed to remove normalize source");
        }

        let staged = match result {
            Ok(()) => self.engine.read_file(STAGED_FILE).await,
            Err(e) => Err(e),
        };
        if let Err(e) = self.engine.unlink(STAGED_FILE).await {
            debug!(error = %e, "Failed to remove staged upload");
        }

        match staged {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                self.log_port
                    .error(&format!("Normalize of {} failed: {}", name, e))
                    .await;
                Err(DomainError::NormalizeFailed(NORMALIZE_FAILED.to_string()))
            }
        }
    }

    async fn probe_input(&self, working: &[u8]) -> Result<VideoInfo, DomainError> {
        let probed = self
            .probe
            .get_file_info(ProbeFile::new(INPUT_FILE, working.to_vec()))
            .await
            .and_then(|info| info.video_info());

        match probed {
            Ok(info) => Ok(info),
            Err(e) => {
                self.log_port.error(&format!("Probe failed: {}", e)).await;
                if let Err(e) = self.probe.clean_up().await {
                    debug!(error = %e, "Probe clean up failed");
                }
                Err(DomainError::ProbeFailed(PROBE_FAILED.to_string()))
            }
        }
    }

    /// Attach a crop widget, destroying any widget it replaces
    pub fn enable_crop(&self, widget: Arc<dyn CropWidget>) -> Result<CropperHandle, DomainError> {
        if !self.store.borrow().input_file.file_loaded {
            return Err(DomainError::NotLoaded);
        }

        self.disable_crop();
        let handle = CropperHandle::new(widget);
        self.dispatch(Action::CropEnable(handle.clone()));
        Ok(handle)
    }

    /// Destroy the attached widget, if any
    pub fn disable_crop(&self) {
        let current = self.store.borrow().cropper.cropper.clone();
        if let Some(handle) = current {
            handle.destroy();
            self.dispatch(Action::CropDisable);
        }
    }

    /// Constrain the attached crop box
    pub fn set_aspect_ratio(&self, ratio: AspectRatio) -> Result<(), DomainError> {
        let current = self.store.borrow().cropper.cropper.clone();
        let handle =
            current.ok_or_else(|| DomainError::BadArgs("crop is not enabled".to_string()))?;
        handle.set_aspect_ratio(ratio);
        Ok(())
    }

    /// Set the trim range; it must lie within the loaded input
    pub fn set_trim_time(&self, start: Micros, end: Micros) -> Result<(), DomainError> {
        let state = self.state();
        if !state.input_file.file_loaded {
            return Err(DomainError::NotLoaded);
        }
        SettingsValidator::validate_trim((start, end), &state.input_file.video_info)?;
        self.dispatch(Action::TrimTimeSet((start, end)));
        Ok(())
    }

    /// Apply a partial settings update
    pub fn merge_settings(&self, patch: ConvertSettingPatch) -> Result<(), DomainError> {
        if patch.is_empty() {
            return Ok(());
        }
        SettingsValidator::validate_patch(&patch)?;
        if let Some(time) = patch.time {
            let state = self.state();
            if !state.input_file.file_loaded {
                return Err(DomainError::NotLoaded);
            }
            SettingsValidator::validate_trim(time, &state.input_file.video_info)?;
        }
        self.dispatch(Action::SettingsMerge(patch));
        Ok(())
    }

    /// Run the trim+crop phase then the encode phase
    pub async fn convert(&self) -> Result<OutputFile, DomainError> {
        let state = self.state();
        if !state.input_file.file_loaded {
            return Err(DomainError::NotLoaded);
        }
        if !self.begin_conversion() {
            return Err(DomainError::Busy(format!(
                "conversion status is {}",
                self.store.borrow().convertor.convert_status
            )));
        }

        // leftovers of an earlier run; absence is the normal case
        for name in [TRIM_FILE, OUTPUT_FILE] {
            if let Err(e) = self.engine.unlink(name).await {
                debug!(file = name, error = %e, "Nothing to clean up");
            }
        }

        let setting = state.video_editor_config;
        let crop = state
            .cropper
            .cropper
            .as_ref()
            .map(|handle| handle.get_data())
            .unwrap_or_else(|| state.input_file.video_info.full_frame());

        self.log_port
            .info(&format!(
                "Converting {}..{} us, crop {}, speed {}, {} fps, {}k",
                setting.time.0, setting.time.1, crop, setting.speed, setting.fps, setting.bitrate
            ))
            .await;

        let store = Arc::clone(&self.store);
        self.engine.set_progress(Some(Arc::new(move |ratio: f64| {
            // each run reports 0..1; the store expects half of that per phase
            dispatch(&store, Action::Progress(ratio.clamp(0.0, 1.0) / 2.0));
        })));

        let result = self.run_phases(&setting, &crop).await;
        self.engine.set_progress(None);

        match result {
            Ok(data) => {
                self.dispatch(Action::output_loaded(data));
                self.dispatch(Action::ConversionFinished);

                let output = self
                    .store
                    .borrow()
                    .output_file
                    .clone()
                    .ok_or_else(|| DomainError::InternalError("output was not stored".to_string()))?;
                self.log_port
                    .info(&format!("Converted sticker: {} bytes", output.file_size))
                    .await;
                Ok(output)
            }
            Err((phase, e)) => Err(self.fail(phase, e).await),
        }
    }

    /// Atomically move Idle to ConvertingTrim
    fn begin_conversion(&self) -> bool {
        self.store.send_if_modified(|state| {
            if state.convertor.convert_status != ConversionStatus::Idle {
                return false;
            }
            *state = reduce(state, Action::TrimPhaseStart);
            true
        })
    }

    async fn run_phases(
        &self,
        setting: &ConvertSetting,
        crop: &CropInfo,
    ) -> Result<Vec<u8>, (Phase, DomainError)> {
        self.engine
            .run(&CommandBuilder::trim_crop(INPUT_FILE, TRIM_FILE, setting, crop))
            .await
            .map_err(|e| (Phase::Trim, e))?;

        self.dispatch(Action::EncodePhaseStart);
        self.engine
            .run(&CommandBuilder::encode(TRIM_FILE, OUTPUT_FILE, setting))
            .await
            .map_err(|e| (Phase::Encode, e))?;

        let data = self
            .engine
            .read_file(OUTPUT_FILE)
            .await
            .map_err(|e| (Phase::Encode, e))?;

        if let Err(e) = self.engine.unlink(TRIM_FILE).await {
            debug!(error = %e, "Failed to remove intermediate file");
        }
        Ok(data)
    }

    /// Record a failed phase and remove what it may have written
    async fn fail(&self, phase: Phase, error: DomainError) -> DomainError {
        let message = error.to_string();
        self.log_port
            .error(&format!("Conversion failed during {} phase: {}", phase, message))
            .await;

        let partial = match phase {
            Phase::Trim => TRIM_FILE,
            Phase::Encode => OUTPUT_FILE,
        };
        if let Err(e) = self.engine.unlink(partial).await {
            debug!(file = partial, error = %e, "No partial output to remove");
        }

        self.dispatch(Action::ConversionFailed(message.clone()));
        DomainError::ConversionFailed { phase, message }
    }

    /// Return a finished or failed conversion to Idle
    pub fn reset(&self) -> Result<(), DomainError> {
        if self.store.borrow().convertor.convert_status.is_converting() {
            return Err(DomainError::Busy("a conversion is in progress".to_string()));
        }
        self.dispatch(Action::Reset);
        Ok(())
    }

    /// Reset a failed conversion and run it again with the current settings
    pub async fn retry(&self) -> Result<OutputFile, DomainError> {
        let status = self.store.borrow().convertor.convert_status;
        if status != ConversionStatus::Failed {
            return Err(DomainError::BadArgs(format!(
                "nothing to retry, conversion status is {}",
                status
            )));
        }
        self.reset()?;
        self.convert().await
    }

    /// Copy the converted sticker out of the engine workspace
    pub async fn save_output(&self, path: &Path) -> Result<u64, DomainError> {
        let output = self
            .store
            .borrow()
            .output_file
            .clone()
            .ok_or_else(|| DomainError::BadArgs("no converted output".to_string()))?;

        tokio::fs::write(path, &output.blob.data).await.map_err(|e| {
            DomainError::FsFail(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(output.file_size)
    }
}

impl Drop for StickerController {
    fn drop(&mut self) {
        if let Some(handle) = self.store.borrow().cropper.cropper.as_ref() {
            handle.destroy();
        }
    }
}

fn dispatch(store: &watch::Sender<AppState>, action: Action) {
    debug!(action = action.name(), "Dispatch");
    store.send_modify(|state| *state = reduce(state, action));
}

/// Workspace name for an upload awaiting normalization, keeping its extension
fn source_file_name(upload_name: &str) -> String {
    match Path::new(upload_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        Some(ext) => format!("source.{}", ext.to_ascii_lowercase()),
        None => "source".to_string(),
    }
}

#[cfg(test)]
mod tests;
