//! Configuration validation (Jidoka - built-in quality).
//!
//! Validates configuration before conversion to catch errors early and
//! provide actionable feedback.

use crate::config::ExportConfig;
use saque_common::{Result, SaqueError};
use std::collections::HashSet;

/// Configuration validator implementing the Jidoka principle.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate an export configuration.
    ///
    /// Returns `Ok(())` if valid, or an error with actionable suggestions.
    pub fn validate(config: &ExportConfig) -> Result<()> {
        Self::validate_dirs(config)?;
        Self::validate_models(config)?;
        Self::validate_calibration(config)?;
        Ok(())
    }

    fn validate_dirs(config: &ExportConfig) -> Result<()> {
        if !config.model_dir.is_dir() {
            return Err(SaqueError::ConfigValue {
                field: "model_dir".into(),
                message: format!("not a directory: {}", config.model_dir.display()),
                suggestion: "Point model_dir at the directory produced by training".into(),
            });
        }

        if let Some(out) = &config.output_dir {
            if let Some(parent) = out.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(SaqueError::ConfigValue {
                        field: "output_dir".into(),
                        message: format!("parent directory does not exist: {}", parent.display()),
                        suggestion: "Create the parent directory or use a different output path"
                            .into(),
                    });
                }
            }
        }

        if config.scaler_file.is_empty() {
            return Err(SaqueError::ConfigValue {
                field: "scaler_file".into(),
                message: "scaler file name cannot be empty".into(),
                suggestion: "Use the default 'scaler.json'".into(),
            });
        }

        Ok(())
    }

    fn validate_models(config: &ExportConfig) -> Result<()> {
        if config.models.is_empty() {
            return Err(SaqueError::ConfigValue {
                field: "models".into(),
                message: "no models configured".into(),
                suggestion: "List at least one model, e.g. {name: idle_swing_model, num_outputs: 2}".into(),
            });
        }

        let mut seen = HashSet::new();
        for spec in &config.models {
            if spec.name.is_empty() {
                return Err(SaqueError::ConfigValue {
                    field: "models.name".into(),
                    message: "model name cannot be empty".into(),
                    suggestion: "Use the base name of the .safetensors file".into(),
                });
            }

            if !seen.insert(spec.name.as_str()) {
                return Err(SaqueError::ConfigValue {
                    field: "models".into(),
                    message: format!("duplicate model name: {}", spec.name),
                    suggestion: "Each model may appear only once".into(),
                });
            }

            if spec.num_outputs == 0 {
                return Err(SaqueError::ConfigValue {
                    field: format!("models.{}.num_outputs", spec.name),
                    message: "expected output cardinality must be positive".into(),
                    suggestion: "Use 2 for the idle/swing gate, 3 for the stroke type classifier"
                        .into(),
                });
            }
        }

        Ok(())
    }

    fn validate_calibration(config: &ExportConfig) -> Result<()> {
        if config.calibration.samples == 0 {
            return Err(SaqueError::ConfigValue {
                field: "calibration.samples".into(),
                message: "sample count must be positive".into(),
                suggestion: "Use 100 samples unless you have a reason not to".into(),
            });
        }

        Ok(())
    }
}
