//! Feature scaler parameters.
//!
//! The training pipeline exports a `scaler.json` with per-feature mean and
//! scale. The export pipeline only needs it for the feature width of the
//! representative dataset, but the widths are validated here so a stale
//! scaler fails loudly instead of miscalibrating.

use saque_common::{Result, SaqueError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-feature normalization parameters (mean/scale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl FeatureScaler {
    /// Build a scaler, validating the parameter vectors.
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(SaqueError::ShapeMismatch {
                expected: vec![mean.len()],
                actual: vec![scale.len()],
            });
        }
        if mean.is_empty() {
            return Err(SaqueError::Serialization {
                message: "scaler has no features".to_string(),
            });
        }
        if scale.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(SaqueError::Serialization {
                message: "scaler contains non-positive or non-finite scale values".to_string(),
            });
        }

        Ok(Self { mean, scale })
    }

    /// Load scaler parameters from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SaqueError::ScalerNotFound { path: path.to_path_buf() });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SaqueError::Io {
            context: format!("reading scaler file: {}", path.display()),
            source: e,
        })?;

        let raw: FeatureScaler =
            serde_json::from_str(&content).map_err(|e| SaqueError::Serialization {
                message: format!("invalid scaler file {}: {e}", path.display()),
            })?;

        Self::new(raw.mean, raw.scale)
    }

    /// Number of input features the classifier expects.
    pub fn feature_dim(&self) -> usize {
        self.mean.len()
    }

    /// Per-feature means.
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Per-feature scales.
    pub fn scale(&self) -> &[f32] {
        &self.scale
    }
}
