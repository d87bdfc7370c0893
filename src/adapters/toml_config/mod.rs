// TOML config adapter - Configuration file loading

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::*;
use crate::error::{StickerError, StickerResult};
use crate::utils::logging::LogFormat;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "sticker.toml";

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Forward engine output to the log at debug level
    pub logging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            logging: true,
        }
    }
}

/// `[convert]` section, the initial conversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub bitrate: u32,
    pub fps: u32,
    pub speed: f64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE_KBPS,
            fps: DEFAULT_FPS,
            speed: DEFAULT_SPEED,
        }
    }
}

impl ConvertConfig {
    pub fn to_setting(&self) -> ConvertSetting {
        ConvertSetting {
            bitrate: self.bitrate,
            fps: self.fps,
            speed: self.speed,
            ..ConvertSetting::default()
        }
    }
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Complete configuration file contents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerConfig {
    pub engine: EngineConfig,
    pub convert: ConvertConfig,
    pub log: LogConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse configuration text; missing keys keep their defaults
    pub fn parse(content: &str) -> StickerResult<StickerConfig> {
        Ok(toml::from_str(content)?)
    }

    /// Load an explicit configuration file
    pub fn load(path: &Path) -> StickerResult<StickerConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| StickerError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let config = Self::parse(&content).map_err(|e| StickerError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Candidate files, in lookup order
    pub fn default_paths(xdg_config_home: Option<PathBuf>, home: Option<PathBuf>) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        let config_dir = xdg_config_home.or_else(|| home.map(|h| h.join(".config")));
        if let Some(dir) = config_dir {
            paths.push(dir.join("sticker").join("config.toml"));
        }
        paths
    }

    /// Load the first existing file among `paths`, if any
    pub fn discover(paths: &[PathBuf]) -> StickerResult<Option<(PathBuf, StickerConfig)>> {
        for path in paths {
            if path.is_file() {
                return Ok(Some((path.clone(), Self::load(path)?)));
            }
        }
        Ok(None)
    }

    /// Serialize a configuration back to TOML
    pub fn render(config: &StickerConfig) -> StickerResult<String> {
        toml::to_string_pretty(config).map_err(|e| StickerError::Config {
            message: e.to_string(),
        })
    }
}
