//! Configuration initialization and hierarchy management

use std::path::PathBuf;
use std::str::FromStr;

use crate::adapters::{StickerConfig, TomlConfigAdapter};
use crate::cli::Cli;
use crate::domain::model::ConvertSettingPatch;
use crate::domain::rules::SettingsValidator;
use crate::error::{StickerError, StickerResult};
use crate::ports::LogLevel;
use crate::utils::logging::LogFormat;

/// Resolved configuration and where its values came from
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationHierarchy {
    pub config: StickerConfig,
    /// File the base values were read from, if any
    pub source: Option<PathBuf>,
    /// Environment variables that overrode a value
    pub env_overrides: Vec<&'static str>,
}

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> StickerResult<ConfigurationHierarchy> {
    resolve_configuration(cli, |key| std::env::var(key).ok())
}

/// Same as [`initialize_configuration_hierarchy`] with an explicit environment lookup
pub fn resolve_configuration(
    cli: &Cli,
    env: impl Fn(&str) -> Option<String>,
) -> StickerResult<ConfigurationHierarchy> {
    // Step 1 and 2: defaults, then the configuration file
    let (source, mut config) = match &cli.config {
        Some(path) => (Some(path.clone()), TomlConfigAdapter::load(path)?),
        None => {
            let paths = TomlConfigAdapter::default_paths(
                env("XDG_CONFIG_HOME").map(PathBuf::from),
                env("HOME").map(PathBuf::from),
            );
            match TomlConfigAdapter::discover(&paths)? {
                Some((path, config)) => (Some(path), config),
                None => (None, StickerConfig::default()),
            }
        }
    };

    // Step 3: environment variables
    let env_overrides = apply_environment(&mut config, &env)?;

    // Step 4: command-line flags
    apply_cli_overrides(&mut config, cli);

    validate(&config)?;
    Ok(ConfigurationHierarchy {
        config,
        source,
        env_overrides,
    })
}

fn apply_environment(
    config: &mut StickerConfig,
    env: &impl Fn(&str) -> Option<String>,
) -> StickerResult<Vec<&'static str>> {
    let mut applied = Vec::new();

    if let Some(value) = env("STICKER_FFMPEG") {
        config.engine.ffmpeg = PathBuf::from(value);
        applied.push("STICKER_FFMPEG");
    }
    if let Some(value) = env("STICKER_FFPROBE") {
        config.engine.ffprobe = PathBuf::from(value);
        applied.push("STICKER_FFPROBE");
    }
    if let Some(value) = env("STICKER_LOG_LEVEL") {
        config.log.level = value;
        applied.push("STICKER_LOG_LEVEL");
    }
    if let Some(value) = env("STICKER_BITRATE") {
        config.convert.bitrate = parse_env("STICKER_BITRATE", &value)?;
        applied.push("STICKER_BITRATE");
    }
    if let Some(value) = env("STICKER_FPS") {
        config.convert.fps = parse_env("STICKER_FPS", &value)?;
        applied.push("STICKER_FPS");
    }
    if let Some(value) = env("STICKER_SPEED") {
        config.convert.speed = parse_env("STICKER_SPEED", &value)?;
        applied.push("STICKER_SPEED");
    }

    Ok(applied)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> StickerResult<T> {
    value.trim().parse().map_err(|_| StickerError::Config {
        message: format!("{} has an invalid value: {}", key, value),
    })
}

fn apply_cli_overrides(config: &mut StickerConfig, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if cli.log_json {
        config.log.format = LogFormat::Json;
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.engine.ffmpeg = ffmpeg.clone();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.engine.ffprobe = ffprobe.clone();
    }
}

fn validate(config: &StickerConfig) -> StickerResult<()> {
    let config_error = |e: crate::domain::errors::DomainError| StickerError::Config {
        message: e.to_string(),
    };

    LogLevel::parse(&config.log.level).map_err(config_error)?;
    SettingsValidator::validate_patch(&ConvertSettingPatch {
        bitrate: Some(config.convert.bitrate),
        fps: Some(config.convert.fps),
        speed: Some(config.convert.speed),
        time: None,
    })
    .map_err(config_error)
}
