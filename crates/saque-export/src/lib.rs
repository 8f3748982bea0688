//! Quantized artifact export CLI.
//!
//! This crate provides the model → artifact half of the toolchain:
//! - Configure the model set and calibration via YAML
//! - Stage, calibrate, and quantize each trained classifier
//! - Write flat binary artifacts and smoke-test them
//!
//! # Toyota Way Principles
//!
//! - **Jidoka**: Pre-flight validation catches config errors before any
//!   conversion work
//! - **Heijunka**: Models are processed one at a time, failures isolated
//! - **Genchi Genbutsu**: The smoke test exercises the bytes on disk

pub mod config;
pub mod pipeline;
pub mod validation;

pub use config::{CalibrationConfig, ExportConfig, ModelSpec};
pub use pipeline::{BatchResult, ModelOutcome, ModelReport, Pipeline};
pub use validation::ConfigValidator;

use saque_common::Result;

/// Run the export pipeline with the given configuration.
pub fn run(config: &ExportConfig) -> Result<BatchResult> {
    // Validate configuration first (Jidoka)
    ConfigValidator::validate(config)?;

    // Execute pipeline
    Pipeline::new(config).execute()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_rejects_invalid_config() {
        let mut config = ExportConfig::production("/nonexistent/models");
        config.models.clear();

        assert!(run(&config).is_err());
    }
}
