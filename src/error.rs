//! Error types for fsmn-vad.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VadError {
    // Configuration errors
    #[error("CMVN statistics file not found at {path}")]
    CmvnFileNotFound { path: String },

    #[error("Failed to parse CMVN statistics: {message}")]
    CmvnParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Dimensional consistency errors
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cache shape mismatch at layer {layer}: expected {expected} values, got {actual}")]
    CacheShapeMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    // Scorer errors
    #[error("Scorer failed: {message}")]
    ScorerFailure { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VadError>;
