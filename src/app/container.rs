use std::sync::Arc;

use crate::adapters::{
    FfmpegEngineAdapter, FfprobeBackend, ProbeWorker, StickerConfig, TracingLogAdapter,
};
use crate::app::controller::{ControllerOptions, StickerController};
use crate::app::inspect_interactor::InspectInteractor;
use crate::domain::errors::DomainError;
use crate::ports::{EnginePort, LogLevel, LogPort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn controller(&self) -> Arc<StickerController>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
}

/// Wires the ffmpeg/ffprobe adapters into the application layer
///
/// Must be built inside a tokio runtime; the probe worker task starts here.
pub struct DefaultAppContainer {
    controller: Arc<StickerController>,
    inspect_interactor: Arc<InspectInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: &StickerConfig) -> Result<Self, DomainError> {
        let log_level = LogLevel::parse(&config.log.level)?;

        let engine_port = Arc::new(FfmpegEngineAdapter::new(config.engine.ffmpeg.clone())?);
        let probe_port = Arc::new(ProbeWorker::spawn(FfprobeBackend::new(
            config.engine.ffprobe.clone(),
        )));
        let log_port = Arc::new(TracingLogAdapter::new(log_level));

        let controller = Arc::new(StickerController::new(
            Arc::clone(&engine_port) as Arc<dyn EnginePort>,
            Arc::clone(&probe_port) as Arc<dyn ProbePort>,
            Arc::clone(&log_port) as Arc<dyn LogPort>,
            ControllerOptions {
                settings: config.convert.to_setting(),
                engine_logging: config.engine.logging,
            },
        ));

        let inspect_interactor = Arc::new(InspectInteractor::new(
            Arc::clone(&probe_port) as Arc<dyn ProbePort>,
            Arc::clone(&log_port) as Arc<dyn LogPort>,
        ));

        Ok(Self {
            controller,
            inspect_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn controller(&self) -> Arc<StickerController> {
        Arc::clone(&self.controller)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }
}
