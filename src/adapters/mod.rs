// Adapters - External system implementations

pub mod crop_fixed;
pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod probe_worker;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use crop_fixed::FixedCropWidget;
pub use exec_ffmpeg::FfmpegEngineAdapter;
pub use probe_ffprobe::FfprobeBackend;
pub use probe_worker::{ProbeBackend, ProbeWorker};
pub use toml_config::{StickerConfig, TomlConfigAdapter};
pub use tracing_log::TracingLogAdapter;
