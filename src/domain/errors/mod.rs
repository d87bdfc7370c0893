// Domain errors - Error types for the domain layer

use std::fmt;

/// Conversion phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Trim,
    Encode,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Trim => write!(f, "trim"),
            Phase::Encode => write!(f, "encode"),
        }
    }
}

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Upload payload was not a file
    InvalidUpload(String),
    /// Container normalization to H.264/MP4 failed
    NormalizeFailed(String),
    /// Metadata extraction failed
    ProbeFailed(String),
    /// Trim or encode invocation rejected
    ConversionFailed { phase: Phase, message: String },
    /// A conversion is already in flight or not yet reset
    Busy(String),
    /// No input file has been loaded yet
    NotLoaded,
    /// Engine binary missing or not initialised
    EngineUnavailable(String),
    /// Engine exited unsuccessfully
    EngineFailed(String),
    /// Workspace file system failure
    FsFail(String),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::InvalidUpload(msg) => write!(f, "Invalid upload: {}", msg),
            DomainError::NormalizeFailed(msg) => write!(f, "Normalize failed: {}", msg),
            DomainError::ProbeFailed(msg) => write!(f, "Probe failed: {}", msg),
            DomainError::ConversionFailed { phase, message } => {
                write!(f, "Conversion failed during {} phase: {}", phase, message)
            }
            DomainError::Busy(msg) => write!(f, "Busy: {}", msg),
            DomainError::NotLoaded => write!(f, "No input file loaded"),
            DomainError::EngineUnavailable(msg) => write!(f, "Engine unavailable: {}", msg),
            DomainError::EngineFailed(msg) => write!(f, "Engine failed: {}", msg),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
