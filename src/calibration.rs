//! Post-training quantization calibration.
//!
//! Quantization ranges come from observing a synthetic representative
//! dataset: standard-normal feature vectors matching the scaler's width,
//! stand-ins for real normalized swing features. The calibrator collects
//! min/max statistics per tensor and turns them into 8-bit quantization
//! parameters.

use crate::model::MlpModel;
use crate::quant::{QuantParams, QMAX, QMIN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use saque_common::{Result, SaqueError};

/// Default number of representative samples.
pub const DEFAULT_SAMPLES: usize = 100;

/// Default RNG seed for reproducible calibration runs.
pub const DEFAULT_SEED: u64 = 42;

/// Generate `count` synthetic standard-normal feature vectors.
///
/// Samples are drawn with a seeded Box-Muller transform so repeated runs
/// over the same model produce identical artifacts.
pub fn representative_dataset(feature_dim: usize, count: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            (0..feature_dim)
                .map(|_| {
                    let u1: f64 = rng.random::<f64>().max(1e-10);
                    let u2: f64 = rng.random::<f64>();
                    ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
                })
                .collect()
        })
        .collect()
}

/// Min/max range calibrator producing 8-bit quantization parameters.
#[derive(Clone, Debug)]
pub struct Calibrator {
    symmetric: bool,
    running_min: Option<f32>,
    running_max: Option<f32>,
    num_batches: usize,
}

impl Calibrator {
    /// Symmetric calibration (weights): zero point pinned at 0.
    pub fn symmetric() -> Self {
        Self { symmetric: true, running_min: None, running_max: None, num_batches: 0 }
    }

    /// Asymmetric calibration (activations): full i8 range with zero point.
    pub fn asymmetric() -> Self {
        Self { symmetric: false, running_min: None, running_max: None, num_batches: 0 }
    }

    /// Observe a batch of values.
    pub fn observe(&mut self, data: &[f32]) {
        if data.is_empty() {
            return;
        }

        let batch_min = data.iter().copied().fold(f32::INFINITY, f32::min);
        let batch_max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        self.running_min = Some(self.running_min.map_or(batch_min, |m| m.min(batch_min)));
        self.running_max = Some(self.running_max.map_or(batch_max, |m| m.max(batch_max)));
        self.num_batches += 1;
    }

    /// Number of batches observed.
    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    /// Check if any data has been observed.
    pub fn has_data(&self) -> bool {
        self.num_batches > 0
    }

    /// Compute quantization parameters from the observed range.
    ///
    /// The asymmetric range is extended to include 0.0 so the zero point
    /// always lands inside the i8 range and real zero is exactly
    /// representable.
    pub fn compute(&self) -> QuantParams {
        let min_val = self.running_min.unwrap_or(0.0);
        let max_val = self.running_max.unwrap_or(0.0);

        if self.symmetric {
            let max_abs = min_val.abs().max(max_val.abs());
            let scale = if max_abs < 1e-10 { 1e-10 } else { max_abs / QMAX as f32 };
            QuantParams { scale, zero_point: 0 }
        } else {
            let min_val = min_val.min(0.0);
            let max_val = max_val.max(0.0);
            let range = max_val - min_val;
            let scale = if range < 1e-10 { 1e-10 } else { range / (QMAX - QMIN) as f32 };
            let zero_point = (QMIN as f32 - min_val / scale).round() as i32;
            QuantParams { scale, zero_point: zero_point.clamp(QMIN, QMAX) }
        }
    }
}

/// Quantization parameters for the input tensor and every layer output.
#[derive(Debug, Clone)]
pub struct ActivationStats {
    /// Input tensor parameters
    pub input: QuantParams,
    /// Per-layer output tensor parameters, in layer order
    pub layer_outputs: Vec<QuantParams>,
}

impl ActivationStats {
    /// Run the representative dataset through the float model and calibrate
    /// the input and every layer output tensor.
    pub fn collect(model: &MlpModel, samples: &[Vec<f32>]) -> Result<Self> {
        if samples.is_empty() {
            return Err(SaqueError::ConfigValue {
                field: "calibration.samples".to_string(),
                message: "no representative samples provided".to_string(),
                suggestion: "Use at least 1 sample (100 recommended)".to_string(),
            });
        }

        let mut input_cal = Calibrator::asymmetric();
        let mut layer_cals: Vec<Calibrator> =
            (0..model.num_layers()).map(|_| Calibrator::asymmetric()).collect();

        for sample in samples {
            input_cal.observe(sample);
            let trace = model.forward_trace(sample)?;
            for (cal, tensor) in layer_cals.iter_mut().zip(trace.layer_outputs.iter()) {
                cal.observe(tensor);
            }
        }

        Ok(Self {
            input: input_cal.compute(),
            layer_outputs: layer_cals.iter().map(Calibrator::compute).collect(),
        })
    }
}
