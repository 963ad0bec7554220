//! Error types and exit codes for loop-convert
//!
//! Rejected loops are not errors: they are counted and reported. Only failures
//! at the tool boundary (reading files, parsing, configuration) end up here.

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for loop-convert operations
#[derive(Error, Debug)]
pub enum LoopConvertError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported language for extension: {extension}")]
    UnsupportedLanguage { extension: String },

    #[error("Failed to parse file: {message}")]
    ParseFailure { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoopConvertError {
    /// Convert error to the process exit code:
    /// - 0: Success
    /// - 1: File not found / IO or output error
    /// - 2: Unsupported language
    /// - 3: Parse failure
    /// - 4: Configuration error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(1),
            Self::UnsupportedLanguage { .. } => ExitCode::from(2),
            Self::ParseFailure { .. } => ExitCode::from(3),
            Self::ConfigError { .. } => ExitCode::from(4),
            Self::Io(_) | Self::Json(_) => ExitCode::from(1),
        }
    }
}

/// Result type alias for loop-convert operations
pub type Result<T> = std::result::Result<T, LoopConvertError>;
