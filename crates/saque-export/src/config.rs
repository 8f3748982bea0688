//! Export configuration parsing and management.
//!
//! Everything the pipeline touches (directories, scaler file, calibration
//! parameters, the model list) arrives through this struct; the pipeline
//! is a pure function of its configuration.

use saque_common::{Result, SaqueError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory containing trained models and the feature scaler
    pub model_dir: PathBuf,
    /// Output directory for artifacts (defaults to `model_dir`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Feature scaler file name inside `model_dir`
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    /// Calibration parameters
    #[serde(default)]
    pub calibration: CalibrationConfig,
    /// Models to convert
    #[serde(default = "default_models")]
    pub models: Vec<ModelSpec>,
}

/// One model to convert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name; resolves to `<model_dir>/<name>.safetensors`
    pub name: String,
    /// Expected number of output classes
    pub num_outputs: usize,
}

/// Representative dataset parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Number of synthetic samples
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// RNG seed for reproducible artifacts
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { samples: default_samples(), seed: default_seed() }
    }
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_samples() -> usize {
    saque::calibration::DEFAULT_SAMPLES
}

fn default_seed() -> u64 {
    saque::calibration::DEFAULT_SEED
}

fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec { name: "idle_swing_model".to_string(), num_outputs: 2 },
        ModelSpec { name: "stroke_type_model".to_string(), num_outputs: 3 },
    ]
}

impl ExportConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SaqueError::ConfigNotFound { path: path.to_path_buf() });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SaqueError::Io {
            context: format!("reading config file: {}", path.display()),
            source: e,
        })?;

        Self::from_yaml(&content, path)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| SaqueError::ConfigParsing {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The production model set rooted at `model_dir`.
    pub fn production(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            output_dir: None,
            scaler_file: default_scaler_file(),
            calibration: CalibrationConfig::default(),
            models: default_models(),
        }
    }

    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| self.model_dir.clone())
    }

    /// Path of a model's SafeTensors file.
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(format!("{name}.safetensors"))
    }

    /// Path of the feature scaler.
    pub fn scaler_path(&self) -> PathBuf {
        self.model_dir.join(&self.scaler_file)
    }

    /// Path of a model's quantized artifact.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.output_dir().join(format!("{name}.{}", saque::artifact::EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
model_dir: "./models"
output_dir: "./firmware"
scaler_file: scaler.json

calibration:
  samples: 100
  seed: 42

models:
  - name: idle_swing_model
    num_outputs: 2
  - name: stroke_type_model
    num_outputs: 3
"#;

    #[test]
    fn test_parse_yaml_config() {
        let config: ExportConfig =
            serde_yaml::from_str(SAMPLE_YAML).expect("Failed to parse YAML");

        assert_eq!(config.model_dir, PathBuf::from("./models"));
        assert_eq!(config.output_dir, Some(PathBuf::from("./firmware")));
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].name, "idle_swing_model");
        assert_eq!(config.models[0].num_outputs, 2);
        assert_eq!(config.models[1].num_outputs, 3);
        assert_eq!(config.calibration.samples, 100);
        assert_eq!(config.calibration.seed, 42);
    }

    #[test]
    fn test_minimal_yaml_gets_defaults() {
        let config: ExportConfig =
            serde_yaml::from_str("model_dir: ./models").expect("config should be valid");

        assert_eq!(config.scaler_file, "scaler.json");
        assert_eq!(config.calibration.samples, 100);
        assert_eq!(config.calibration.seed, 42);
        assert_eq!(config.models.len(), 2);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_production_config() {
        let config = ExportConfig::production("/data/models");

        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].name, "idle_swing_model");
        assert_eq!(config.models[1].name, "stroke_type_model");
        assert_eq!(config.output_dir(), PathBuf::from("/data/models"));
    }

    #[test]
    fn test_path_resolution() {
        let config = ExportConfig::production("/data/models");

        assert_eq!(
            config.model_path("idle_swing_model"),
            PathBuf::from("/data/models/idle_swing_model.safetensors")
        );
        assert_eq!(config.scaler_path(), PathBuf::from("/data/models/scaler.json"));
        assert_eq!(
            config.artifact_path("idle_swing_model"),
            PathBuf::from("/data/models/idle_swing_model.sqm")
        );
    }

    #[test]
    fn test_output_dir_override() {
        let mut config = ExportConfig::production("/data/models");
        config.output_dir = Some(PathBuf::from("/firmware/src"));

        assert_eq!(
            config.artifact_path("stroke_type_model"),
            PathBuf::from("/firmware/src/stroke_type_model.sqm")
        );
    }

    #[test]
    fn test_from_file_missing() {
        let result = ExportConfig::from_file("/nonexistent/export.yaml");
        assert!(matches!(result, Err(SaqueError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_from_yaml_invalid() {
        let result = ExportConfig::from_yaml("models: [", Path::new("bad.yaml"));
        assert!(matches!(result, Err(SaqueError::ConfigParsing { .. })));
    }
}
