//! Error handling module for the sticker converter

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for crate-level operations
#[derive(Error, Debug)]
pub enum StickerError {
    /// Input file not found or inaccessible
    #[error("Input file not found: {path}")]
    InputFileNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Logging subscriber could not be installed
    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },

    /// Output file write error
    #[error("Failed to write output file: {message}")]
    OutputError { message: String },

    /// Domain error crossing a port boundary
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for crate operations
pub type StickerResult<T> = std::result::Result<T, StickerError>;
