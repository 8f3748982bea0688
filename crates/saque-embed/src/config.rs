//! Embed configuration: which artifacts become which header symbols.

use saque_common::{Result, SaqueError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Complete embed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Directory containing quantized artifacts
    pub model_dir: PathBuf,
    /// Output directory for headers (defaults to `model_dir`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Artifacts to embed
    #[serde(default = "default_models")]
    pub models: Vec<EmbedSpec>,
}

/// One artifact and the symbol names its header exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedSpec {
    /// Artifact file name inside `model_dir`
    pub file: String,
    /// Byte array identifier
    pub array_name: String,
    /// Length constant identifier
    pub len_name: String,
}

impl EmbedSpec {
    /// Derive the conventional symbol pair for an artifact file name:
    /// `<stem>_data` and `<stem>_data_len`.
    pub fn for_file(file: impl Into<String>) -> Self {
        let file = file.into();
        let stem = Path::new(&file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.clone());
        Self {
            array_name: format!("{stem}_data"),
            len_name: format!("{stem}_data_len"),
            file,
        }
    }
}

fn default_models() -> Vec<EmbedSpec> {
    vec![
        EmbedSpec::for_file("idle_swing_model.sqm"),
        EmbedSpec::for_file("stroke_type_model.sqm"),
    ]
}

impl EmbedConfig {
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

    /// The production artifact set rooted at `model_dir`.
    pub fn production(model_dir: impl Into<PathBuf>) -> Self {
        Self { model_dir: model_dir.into(), output_dir: None, models: default_models() }
    }

    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| self.model_dir.clone())
    }

    /// Path of one artifact.
    pub fn artifact_path(&self, spec: &EmbedSpec) -> PathBuf {
        self.model_dir.join(&spec.file)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            return Err(SaqueError::ConfigValue {
                field: "models".into(),
                message: "no artifacts configured".into(),
                suggestion: "List at least one artifact, e.g. {file: idle_swing_model.sqm, array_name: idle_swing_model_data, len_name: idle_swing_model_data_len}".into(),
            });
        }

        let mut files = HashSet::new();
        let mut symbols = HashSet::new();
        for spec in &self.models {
            if spec.file.is_empty() {
                return Err(SaqueError::ConfigValue {
                    field: "models.file".into(),
                    message: "artifact file name cannot be empty".into(),
                    suggestion: "Use the artifact file name produced by saque-export".into(),
                });
            }

            if !files.insert(spec.file.as_str()) {
                return Err(SaqueError::ConfigValue {
                    field: "models".into(),
                    message: format!("duplicate artifact: {}", spec.file),
                    suggestion: "Each artifact may appear only once".into(),
                });
            }

            for (field, name) in [("array_name", &spec.array_name), ("len_name", &spec.len_name)]
            {
                if !is_c_identifier(name) {
                    return Err(SaqueError::ConfigValue {
                        field: format!("models.{}.{field}", spec.file),
                        message: format!("'{name}' is not a valid C identifier"),
                        suggestion: "Use letters, digits, and underscores, not starting with a digit".into(),
                    });
                }
                if !symbols.insert(name.as_str()) {
                    return Err(SaqueError::ConfigValue {
                        field: format!("models.{}.{field}", spec.file),
                        message: format!("duplicate symbol name: {name}"),
                        suggestion: "Headers linked into one firmware image need unique symbols"
                            .into(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Check that a symbol is a valid C identifier.
fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
model_dir: "./firmware"

models:
  - file: idle_swing_model.sqm
    array_name: idle_swing_model_data
    len_name: idle_swing_model_data_len
  - file: stroke_type_model.sqm
    array_name: stroke_type_model_data
    len_name: stroke_type_model_data_len
"#;

    #[test]
    fn test_parse_yaml_config() {
        let config: EmbedConfig = serde_yaml::from_str(SAMPLE_YAML).expect("valid YAML");

        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].file, "idle_swing_model.sqm");
        assert_eq!(config.models[0].array_name, "idle_swing_model_data");
        assert_eq!(config.models[1].len_name, "stroke_type_model_data_len");
    }

    #[test]
    fn test_default_model_mapping() {
        let config = EmbedConfig::production("/firmware");

        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].array_name, "idle_swing_model_data");
        assert_eq!(config.models[0].len_name, "idle_swing_model_data_len");
        assert_eq!(config.models[1].array_name, "stroke_type_model_data");
    }

    #[test]
    fn test_for_file_derives_symbols() {
        let spec = EmbedSpec::for_file("my_model.sqm");

        assert_eq!(spec.file, "my_model.sqm");
        assert_eq!(spec.array_name, "my_model_data");
        assert_eq!(spec.len_name, "my_model_data_len");
    }

    #[test]
    fn test_validate_production_config() {
        assert!(EmbedConfig::production("/firmware").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_models() {
        let mut config = EmbedConfig::production("/firmware");
        config.models.clear();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_files() {
        let mut config = EmbedConfig::production("/firmware");
        let dup = config.models[0].clone();
        config.models.push(dup);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate artifact"));
    }

    #[test]
    fn test_validate_rejects_duplicate_symbols() {
        let mut config = EmbedConfig::production("/firmware");
        config.models[1].array_name = config.models[0].array_name.clone();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate symbol"));
    }

    #[test]
    fn test_validate_rejects_bad_identifier() {
        let mut config = EmbedConfig::production("/firmware");
        config.models[0].array_name = "9starts_with_digit".into();

        assert!(config.validate().is_err());

        config.models[0].array_name = "has-dash".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = EmbedConfig::from_file("/nonexistent/embed.yaml");
        assert!(matches!(result, Err(SaqueError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_artifact_path_resolution() {
        let config = EmbedConfig::production("/firmware");
        let path = config.artifact_path(&config.models[0]);

        assert_eq!(path, PathBuf::from("/firmware/idle_swing_model.sqm"));
    }
}
