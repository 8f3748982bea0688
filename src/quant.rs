//! 8-bit post-training quantization of a loaded classifier.
//!
//! Weights are quantized per-tensor symmetric to i8, biases to i32 at
//! `weight_scale * input_scale`, and activations carry asymmetric i8
//! parameters from calibration. The artifact's external interface stays
//! f32 on both ends; only internal tensors are integer.

use crate::calibration::ActivationStats;
use crate::model::{Activation, MlpModel};
use saque_common::{Result, SaqueError};

/// Minimum representable quantized value.
pub const QMIN: i32 = -128;

/// Maximum representable quantized value.
pub const QMAX: i32 = 127;

/// Scale and zero point of one quantized tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    /// Real value represented by one quantized step
    pub scale: f32,
    /// Quantized value representing real 0.0
    pub zero_point: i32,
}

impl QuantParams {
    /// Quantize a real value to i8.
    pub fn quantize(&self, x: f32) -> i8 {
        let q = (x / self.scale).round() as i32 + self.zero_point;
        q.clamp(QMIN, QMAX) as i8
    }

    /// Dequantize an i8 value back to f32.
    pub fn dequantize(&self, q: i8) -> f32 {
        (i32::from(q) - self.zero_point) as f32 * self.scale
    }
}

/// One dense layer in quantized form.
#[derive(Debug, Clone)]
pub struct QuantizedLayer {
    /// Input width
    pub in_dim: usize,
    /// Output width
    pub out_dim: usize,
    /// Activation fused into this layer
    pub activation: Activation,
    /// Per-tensor symmetric weight scale
    pub weight_scale: f32,
    /// Output tensor quantization parameters
    pub output: QuantParams,
    /// Bias, quantized to i32 at `weight_scale * input_scale`
    pub bias: Vec<i32>,
    /// Weights, `[out_dim * in_dim]` row-major i8
    pub weights: Vec<i8>,
}

/// A fully quantized classifier ready for encoding.
#[derive(Debug, Clone)]
pub struct QuantizedModel {
    /// Input tensor quantization parameters
    pub input: QuantParams,
    /// Layers in execution order
    pub layers: Vec<QuantizedLayer>,
}

impl QuantizedModel {
    /// Number of input features.
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim
    }

    /// Number of output classes.
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

/// Quantize a weight tensor per-tensor symmetric.
///
/// Returns the i8 values and the scale (`max_abs / 127`, floored to avoid
/// division by zero on all-zero tensors).
pub fn quantize_weights(values: &[f32]) -> (Vec<i8>, f32) {
    let max_abs = values
        .iter()
        .map(|v| v.abs())
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(0.0);

    let scale = if max_abs < 1e-10 { 1e-10 } else { max_abs / QMAX as f32 };

    let quantized = values
        .iter()
        .map(|&v| (v / scale).round().clamp(QMIN as f32, QMAX as f32) as i8)
        .collect();

    (quantized, scale)
}

/// Quantize a bias vector to i32 at the given accumulator scale.
pub fn quantize_bias(bias: &[f32], bias_scale: f32) -> Vec<i32> {
    bias.iter().map(|&v| (v / bias_scale).round() as i32).collect()
}

/// Quantize a loaded model using calibrated activation statistics.
///
/// `feature_dim` is the representative-data width; it must equal the model's
/// input width, otherwise calibration statistics would not describe the
/// tensors they are applied to.
pub fn quantize_model(
    model: &MlpModel,
    stats: &ActivationStats,
    feature_dim: usize,
) -> Result<QuantizedModel> {
    if feature_dim != model.input_dim() {
        return Err(SaqueError::ShapeMismatch {
            expected: vec![model.input_dim()],
            actual: vec![feature_dim],
        });
    }
    if stats.layer_outputs.len() != model.num_layers() {
        return Err(SaqueError::Internal {
            message: format!(
                "calibration covered {} layers, model has {}",
                stats.layer_outputs.len(),
                model.num_layers()
            ),
        });
    }

    let mut layers = Vec::with_capacity(model.num_layers());
    let mut in_params = stats.input;

    for (layer, &out_params) in model.layers().iter().zip(stats.layer_outputs.iter()) {
        let weight_values: Vec<f32> = layer.weights.iter().copied().collect();
        let (weights, weight_scale) = quantize_weights(&weight_values);

        let bias_values: Vec<f32> = layer.bias.iter().copied().collect();
        let bias = quantize_bias(&bias_values, weight_scale * in_params.scale);

        layers.push(QuantizedLayer {
            in_dim: layer.in_dim(),
            out_dim: layer.out_dim(),
            activation: layer.activation,
            weight_scale,
            output: out_params,
            bias,
            weights,
        });

        in_params = out_params;
    }

    Ok(QuantizedModel { input: stats.input, layers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{representative_dataset, ActivationStats, DEFAULT_SEED};
    use crate::model::DenseLayer;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};
    use proptest::prelude::*;

    fn tiny_model() -> MlpModel {
        let l0 = DenseLayer {
            weights: Array2::from_shape_vec((3, 4), vec![
                0.5, -0.25, 0.1, 0.0, //
                -0.3, 0.2, 0.4, -0.1, //
                0.05, 0.15, -0.2, 0.35,
            ])
            .unwrap(),
            bias: Array1::from_vec(vec![0.1, -0.05, 0.0]),
            activation: Activation::Relu,
        };
        let l1 = DenseLayer {
            weights: Array2::from_shape_vec((2, 3), vec![0.6, -0.4, 0.2, -0.1, 0.3, -0.5])
                .unwrap(),
            bias: Array1::from_vec(vec![0.05, -0.02]),
            activation: Activation::Softmax,
        };
        MlpModel::new(vec![l0, l1]).unwrap()
    }

    fn quantize_tiny() -> QuantizedModel {
        let model = tiny_model();
        let samples = representative_dataset(4, 100, DEFAULT_SEED);
        let stats = ActivationStats::collect(&model, &samples).unwrap();
        quantize_model(&model, &stats, 4).unwrap()
    }

    #[test]
    fn test_quantize_weights_round_trip_error() {
        let values = vec![1.0, -2.0, 3.5, -4.2, 0.5, -0.8, 2.1, -1.5];
        let (quantized, scale) = quantize_weights(&values);

        for (&original, &q) in values.iter().zip(quantized.iter()) {
            let restored = f32::from(q) * scale;
            assert!(
                (original - restored).abs() <= scale * 0.5 + 1e-6,
                "{original} → {restored} exceeds half-step error"
            );
        }
    }

    #[test]
    fn test_quantize_weights_all_zero() {
        let (quantized, scale) = quantize_weights(&[0.0; 16]);

        assert!(scale > 0.0);
        assert!(quantized.iter().all(|&q| q == 0));
    }

    #[test]
    fn test_quantize_bias_scaling() {
        let bias = quantize_bias(&[1.0, -0.5, 0.0], 0.01);
        assert_eq!(bias, vec![100, -50, 0]);
    }

    #[test]
    fn test_quant_params_round_trip() {
        let params = QuantParams { scale: 0.05, zero_point: -10 };

        for x in [-3.0f32, -0.5, 0.0, 0.5, 2.0] {
            let q = params.quantize(x);
            let restored = params.dequantize(q);
            assert_abs_diff_eq!(restored, x.clamp(
                params.dequantize(QMIN as i8),
                params.dequantize(QMAX as i8),
            ), epsilon = 0.05);
        }
    }

    #[test]
    fn test_quantize_model_structure() {
        let quantized = quantize_tiny();

        assert_eq!(quantized.num_layers(), 2);
        assert_eq!(quantized.input_dim(), 4);
        assert_eq!(quantized.output_dim(), 2);
        assert_eq!(quantized.layers[0].weights.len(), 12);
        assert_eq!(quantized.layers[0].bias.len(), 3);
        assert_eq!(quantized.layers[1].activation, Activation::Softmax);
    }

    #[test]
    fn test_quantize_model_rejects_width_mismatch() {
        let model = tiny_model();
        let samples = representative_dataset(4, 20, DEFAULT_SEED);
        let stats = ActivationStats::collect(&model, &samples).unwrap();

        // Scaler claims 35 features, model takes 4.
        let result = quantize_model(&model, &stats, 35);
        assert!(matches!(result, Err(SaqueError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_quantize_model_rejects_partial_stats() {
        let model = tiny_model();
        let samples = representative_dataset(4, 20, DEFAULT_SEED);
        let mut stats = ActivationStats::collect(&model, &samples).unwrap();
        stats.layer_outputs.pop();

        let result = quantize_model(&model, &stats, 4);
        assert!(matches!(result, Err(SaqueError::Internal { .. })));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(200))]

        /// Weight quantization error never exceeds half a quantization step.
        #[test]
        fn prop_weight_quantization_bounded_error(
            values in prop::collection::vec(-10.0f32..10.0, 1..256),
        ) {
            let (quantized, scale) = quantize_weights(&values);

            for (&original, &q) in values.iter().zip(quantized.iter()) {
                let restored = f32::from(q) * scale;
                prop_assert!((original - restored).abs() <= scale * 0.5 + 1e-5);
            }
        }

        /// Quantized weights always stay in the i8 range dictated by the scale.
        #[test]
        fn prop_weight_magnitude_bounded(
            values in prop::collection::vec(-100.0f32..100.0, 1..128),
        ) {
            let (quantized, _) = quantize_weights(&values);
            prop_assert!(quantized.iter().all(|&q| i32::from(q) >= QMIN && i32::from(q) <= QMAX));
        }
    }
}
