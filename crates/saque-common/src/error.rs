//! Error types with actionable diagnostics (Andon principle).
//!
//! All errors include contextual information to help users resolve issues
//! without needing to consult external documentation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for saque operations.
pub type Result<T> = std::result::Result<T, SaqueError>;

/// Errors that can occur in saque CLI tools.
///
/// Each variant includes actionable context following the Andon principle
/// of making problems immediately visible and actionable.
#[derive(Error, Debug)]
pub enum SaqueError {
    /// Configuration file not found at expected path.
    #[error("Configuration file not found: {path}\n  → Create a config file or use --config to specify a different path")]
    ConfigNotFound { path: PathBuf },

    /// Configuration file has invalid syntax.
    #[error("Invalid configuration syntax in {path}:\n  {message}\n  → Check YAML/JSON syntax at the indicated line")]
    ConfigParsing { path: PathBuf, message: String },

    /// Configuration value is invalid.
    #[error("Invalid configuration value for '{field}': {message}\n  → {suggestion}")]
    ConfigValue { field: String, message: String, suggestion: String },

    /// Trained model file not found.
    #[error("Model file not found: {path}\n  → Train the classifier first or check model_dir in the config")]
    ModelNotFound { path: PathBuf },

    /// Feature scaler file not found.
    #[error("Scaler file not found: {path}\n  → Export the feature scaler alongside the trained models")]
    ScalerNotFound { path: PathBuf },

    /// Quantized artifact file not found.
    #[error("Artifact file not found: {path}\n  → Run saque-export first to produce the quantized artifact")]
    ArtifactNotFound { path: PathBuf },

    /// Model or tensor format is unsupported.
    #[error("Unsupported format: {format}\n  → Supported inputs: SafeTensors with F32/F16/BF16 tensors")]
    UnsupportedFormat { format: String },

    /// Invalid tensor shape.
    #[error("Tensor shape mismatch: expected {expected:?}, got {actual:?}\n  → Check that the scaler and model were produced by the same training run")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    /// Quantized inference produced a NaN output.
    #[error("Smoke test failed: NaN at output index {index}\n  → The quantized graph is numerically invalid; re-train or re-export the model")]
    NanOutput { index: usize },

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic error for unexpected conditions.
    #[error("Internal error: {message}\n  → Please report this bug at https://github.com/paiml/saque/issues")]
    Internal { message: String },
}

impl SaqueError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Check if this error is user-recoverable.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::ConfigParsing { .. }
                | Self::ConfigValue { .. }
                | Self::ModelNotFound { .. }
                | Self::ScalerNotFound { .. }
                | Self::ArtifactNotFound { .. }
                | Self::UnsupportedFormat { .. }
        )
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } => "E001",
            Self::ConfigParsing { .. } => "E002",
            Self::ConfigValue { .. } => "E003",
            Self::ModelNotFound { .. } => "E010",
            Self::ScalerNotFound { .. } => "E011",
            Self::ArtifactNotFound { .. } => "E012",
            Self::UnsupportedFormat { .. } => "E013",
            Self::ShapeMismatch { .. } => "E040",
            Self::NanOutput { .. } => "E041",
            Self::Io { .. } => "E050",
            Self::Serialization { .. } => "E051",
            Self::Internal { .. } => "E999",
        }
    }
}
