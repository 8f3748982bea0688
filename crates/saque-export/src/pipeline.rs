//! Conversion pipeline execution (Heijunka - level scheduling).
//!
//! Orchestrates the per-model workflow: load, stage, calibrate, quantize,
//! encode, write, smoke test. Every model is isolated at the conversion
//! boundary; one failure never stops the batch.

use crate::config::{ExportConfig, ModelSpec};
use saque::calibration::{representative_dataset, ActivationStats};
use saque::infer::Interpreter;
use saque::model::MlpModel;
use saque::scaler::FeatureScaler;
use saque::{artifact, quantize_model, staging};
use saque_common::{Result, SaqueError};
use std::path::PathBuf;

/// Successful conversion of one model.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    /// Where the artifact was written
    pub artifact_path: PathBuf,
    /// Artifact size in bytes
    pub artifact_bytes: u64,
    /// Smoke test output vector (diagnostic only)
    pub smoke_output: Vec<f32>,
    /// Smoke test output sum (diagnostic only)
    pub smoke_sum: f32,
}

/// Result of attempting one model.
#[derive(Debug, Clone)]
pub enum ModelOutcome {
    /// Converted and smoke-tested
    Converted(ConversionOutcome),
    /// Any stage failed; the batch continued
    Failed { reason: String },
}

/// Per-model report in the batch summary.
#[derive(Debug, Clone)]
pub struct ModelReport {
    /// Model name from the config
    pub name: String,
    /// What happened
    pub outcome: ModelOutcome,
}

impl ModelReport {
    /// Whether this model converted and passed its smoke test.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, ModelOutcome::Converted(_))
    }
}

/// Batch execution result.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// One report per configured model, in config order
    pub reports: Vec<ModelReport>,
    /// Total execution time in seconds
    pub duration_seconds: f64,
}

impl BatchResult {
    /// Overall success requires every model to have passed.
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(ModelReport::passed)
    }

    /// Number of models that passed.
    pub fn passed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    /// Number of models that failed.
    pub fn failed_count(&self) -> usize {
        self.reports.len() - self.passed_count()
    }
}

/// Export pipeline orchestrator.
pub struct Pipeline<'a> {
    config: &'a ExportConfig,
}

impl<'a> Pipeline<'a> {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Convert every configured model, isolating failures per model.
    pub fn execute(&self) -> Result<BatchResult> {
        let start = std::time::Instant::now();

        let out_dir = self.config.output_dir();
        std::fs::create_dir_all(&out_dir).map_err(|e| SaqueError::Io {
            context: format!("creating output directory: {}", out_dir.display()),
            source: e,
        })?;

        let mut reports = Vec::with_capacity(self.config.models.len());
        for spec in &self.config.models {
            let outcome = match self.convert_model(spec) {
                Ok(converted) => ModelOutcome::Converted(converted),
                Err(e) => ModelOutcome::Failed { reason: e.to_string() },
            };
            reports.push(ModelReport { name: spec.name.clone(), outcome });
        }

        Ok(BatchResult { reports, duration_seconds: start.elapsed().as_secs_f64() })
    }

    /// Run the full conversion chain for one model.
    fn convert_model(&self, spec: &ModelSpec) -> Result<ConversionOutcome> {
        let model_path = self.config.model_path(&spec.name);
        if !model_path.exists() {
            return Err(SaqueError::ModelNotFound { path: model_path });
        }

        let scaler = FeatureScaler::from_file(self.config.scaler_path())?;
        let model = MlpModel::from_safetensors(&model_path)?;

        // The synthetic calibration vectors take their width from the
        // scaler; a stale scaler must fail here, not miscalibrate.
        if scaler.feature_dim() != model.input_dim() {
            return Err(SaqueError::ShapeMismatch {
                expected: vec![model.input_dim()],
                actual: vec![scaler.feature_dim()],
            });
        }

        // Staging directory is scoped: removed on success, error, and unwind.
        let staging_dir = tempfile::Builder::new()
            .prefix("saque-stage-")
            .tempdir_in(self.config.output_dir())
            .map_err(|e| SaqueError::io("creating staging directory", e))?;

        staging::stage_model(&model, staging_dir.path())?;
        let staged = staging::load_staged(staging_dir.path())?;

        let samples = representative_dataset(
            scaler.feature_dim(),
            self.config.calibration.samples,
            self.config.calibration.seed,
        );
        let stats = ActivationStats::collect(&staged, &samples)?;
        let quantized = quantize_model(&staged, &stats, scaler.feature_dim())?;

        let bytes = artifact::encode(&quantized);
        let artifact_path = self.config.artifact_path(&spec.name);
        std::fs::write(&artifact_path, &bytes).map_err(|e| SaqueError::Io {
            context: format!("writing artifact: {}", artifact_path.display()),
            source: e,
        })?;

        // Smoke test runs against the bytes on disk, not the in-memory
        // model, so it exercises the artifact the firmware will see.
        let written = std::fs::read(&artifact_path).map_err(|e| SaqueError::Io {
            context: format!("reading back artifact: {}", artifact_path.display()),
            source: e,
        })?;
        let interpreter = Interpreter::from_bytes(&written)?;

        if interpreter.output_dim() != spec.num_outputs {
            return Err(SaqueError::ShapeMismatch {
                expected: vec![spec.num_outputs],
                actual: vec![interpreter.output_dim()],
            });
        }

        let smoke_input = representative_dataset(
            interpreter.input_dim(),
            1,
            self.config.calibration.seed.wrapping_add(1),
        )
        .remove(0);
        let report = interpreter.smoke_test(&smoke_input)?;

        Ok(ConversionOutcome {
            artifact_path,
            artifact_bytes: written.len() as u64,
            smoke_output: report.output,
            smoke_sum: report.sum,
        })
    }
}
