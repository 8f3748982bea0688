//! C header generation for quantized artifacts.
//!
//! This crate provides the artifact → firmware half of the toolchain:
//! - Map artifact files to array/length symbol names via YAML
//! - Render each artifact's bytes as a C header with an include guard
//! - Skip missing artifacts without stopping the batch
//!
//! # Toyota Way Principles
//!
//! - **Genchi Genbutsu**: the length constant comes from the artifact's
//!   actual bytes, never from re-parsed text
//! - **Andon**: skipped artifacts are reported per item in the summary

pub mod config;
pub mod header;

pub use config::{EmbedConfig, EmbedSpec};
pub use header::{generate_header, GeneratedHeader};

use saque_common::Result;

/// Result of attempting one artifact.
#[derive(Debug, Clone)]
pub enum EmbedOutcome {
    /// Header written
    Written(GeneratedHeader),
    /// Artifact missing or unreadable; the batch continued
    Skipped { reason: String },
}

/// Per-artifact report in the batch summary.
#[derive(Debug, Clone)]
pub struct EmbedReport {
    /// Artifact file name from the config
    pub file: String,
    /// What happened
    pub outcome: EmbedOutcome,
}

impl EmbedReport {
    /// Whether a header was written for this artifact.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, EmbedOutcome::Written(_))
    }
}

/// Batch execution result.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// One report per configured artifact, in config order
    pub reports: Vec<EmbedReport>,
}

impl BatchResult {
    /// Overall success requires every artifact to have been embedded.
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(EmbedReport::passed)
    }

    /// Number of headers written.
    pub fn passed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    /// Number of artifacts skipped.
    pub fn skipped_count(&self) -> usize {
        self.reports.len() - self.passed_count()
    }
}

/// Generate headers for every configured artifact, isolating failures
/// per artifact.
pub fn run(config: &EmbedConfig) -> Result<BatchResult> {
    config.validate()?;

    let output_dir = config.output_dir();
    let mut reports = Vec::with_capacity(config.models.len());

    for spec in &config.models {
        let outcome = match generate_header(
            &config.artifact_path(spec),
            &output_dir,
            &spec.array_name,
            &spec.len_name,
        ) {
            Ok(generated) => EmbedOutcome::Written(generated),
            Err(e) => EmbedOutcome::Skipped { reason: e.to_string() },
        };
        reports.push(EmbedReport { file: spec.file.clone(), outcome });
    }

    Ok(BatchResult { reports })
}
