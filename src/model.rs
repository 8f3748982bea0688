//! Trained classifier loading and the float reference forward pass.
//!
//! Models arrive as SafeTensors files containing `dense_<i>.weight` and
//! `dense_<i>.bias` tensors in layer order. The float forward pass is the
//! reference the calibrator observes; quantized execution lives in
//! [`crate::infer`].

use ndarray::{Array1, Array2};
use saque_common::{Result, SaqueError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Identity
    None,
    /// Rectified linear unit
    Relu,
    /// Softmax over the layer output
    Softmax,
}

impl Activation {
    /// Wire code used by the artifact codec.
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Relu => 1,
            Self::Softmax => 2,
        }
    }

    /// Decode a wire code back into an activation.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Relu),
            2 => Ok(Self::Softmax),
            other => Err(SaqueError::Serialization {
                message: format!("unknown activation code {other}"),
            }),
        }
    }
}

/// A dense (fully-connected) layer: `y = act(W x + b)`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    /// Weight matrix, `[out_dim, in_dim]` row-major
    pub weights: Array2<f32>,
    /// Bias vector, `[out_dim]`
    pub bias: Array1<f32>,
    /// Activation applied to the affine output
    pub activation: Activation,
}

impl DenseLayer {
    /// Input width of this layer.
    pub fn in_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Output width of this layer.
    pub fn out_dim(&self) -> usize {
        self.weights.nrows()
    }

    /// Affine output `W x + b` without the activation.
    fn affine(&self, input: &Array1<f32>) -> Array1<f32> {
        self.weights.dot(input) + &self.bias
    }
}

/// A sequential multi-layer perceptron classifier.
#[derive(Debug, Clone)]
pub struct MlpModel {
    layers: Vec<DenseLayer>,
}

/// Per-layer tensors observed during a float forward pass.
///
/// `layer_outputs[i]` holds layer `i`'s output after ReLU for hidden layers
/// and the raw logits for the final layer; Softmax is applied only to
/// `output`. These are exactly the tensors the calibrator needs.
#[derive(Debug, Clone)]
pub struct ForwardTrace {
    pub layer_outputs: Vec<Vec<f32>>,
    pub output: Vec<f32>,
}

impl MlpModel {
    /// Build a model from layers, validating that consecutive widths chain.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(SaqueError::Serialization {
                message: "model has no layers".to_string(),
            });
        }

        for pair in layers.windows(2) {
            if pair[1].in_dim() != pair[0].out_dim() {
                return Err(SaqueError::ShapeMismatch {
                    expected: vec![pair[0].out_dim()],
                    actual: vec![pair[1].in_dim()],
                });
            }
        }

        Ok(Self { layers })
    }

    /// Load a classifier from a SafeTensors file.
    ///
    /// Expects `dense_<i>.weight` (`[out, in]`) and `dense_<i>.bias`
    /// (`[out]`) tensors for consecutive `i` starting at 0. Hidden layers
    /// get ReLU, the final layer Softmax.
    pub fn from_safetensors(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SaqueError::ModelNotFound { path: path.to_path_buf() });
        }

        let data = std::fs::read(path).map_err(|e| SaqueError::Io {
            context: format!("reading model file: {}", path.display()),
            source: e,
        })?;

        let tensors = safetensors::SafeTensors::deserialize(&data).map_err(|e| {
            SaqueError::Serialization {
                message: format!("invalid SafeTensors file {}: {e}", path.display()),
            }
        })?;

        let names: Vec<String> = tensors.names().iter().map(|n| n.to_string()).collect();

        let mut layers = Vec::new();
        let mut index = 0usize;
        loop {
            let weight_name = format!("dense_{index}.weight");
            if !names.iter().any(|n| n == &weight_name) {
                break;
            }

            let weight = read_tensor(&tensors, &weight_name)?;
            if weight.shape.len() != 2 {
                return Err(SaqueError::Serialization {
                    message: format!(
                        "tensor '{weight_name}' must be rank 2, got shape {:?}",
                        weight.shape
                    ),
                });
            }
            let (out_dim, in_dim) = (weight.shape[0], weight.shape[1]);

            let bias_name = format!("dense_{index}.bias");
            let bias = read_tensor(&tensors, &bias_name)?;
            if bias.shape != vec![out_dim] {
                return Err(SaqueError::ShapeMismatch {
                    expected: vec![out_dim],
                    actual: bias.shape,
                });
            }

            let weights =
                Array2::from_shape_vec((out_dim, in_dim), weight.values).map_err(|e| {
                    SaqueError::Serialization {
                        message: format!("tensor '{weight_name}': {e}"),
                    }
                })?;

            layers.push(DenseLayer {
                weights,
                bias: Array1::from_vec(bias.values),
                activation: Activation::Relu,
            });
            index += 1;
        }

        if layers.is_empty() {
            return Err(SaqueError::Serialization {
                message: format!(
                    "no dense_<i>.weight tensors found in {}",
                    path.display()
                ),
            });
        }

        if let Some(last) = layers.last_mut() {
            last.activation = Activation::Softmax;
        }

        Self::new(layers)
    }

    /// Number of input features.
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    /// Number of output classes.
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim()
    }

    /// Number of dense layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Layer access for quantization and staging.
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Consume the model, yielding its layers.
    pub fn into_layers(self) -> Vec<DenseLayer> {
        self.layers
    }

    /// Float reference forward pass.
    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        Ok(self.forward_trace(input)?.output)
    }

    /// Forward pass recording every per-layer output tensor.
    pub fn forward_trace(&self, input: &[f32]) -> Result<ForwardTrace> {
        if input.len() != self.input_dim() {
            return Err(SaqueError::ShapeMismatch {
                expected: vec![self.input_dim()],
                actual: vec![input.len()],
            });
        }

        let mut current = Array1::from_vec(input.to_vec());
        let mut layer_outputs = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let mut out = layer.affine(&current);
            if layer.activation == Activation::Relu {
                out.mapv_inplace(|v| v.max(0.0));
            }
            layer_outputs.push(out.to_vec());
            current = out;
        }

        let last = &self.layers[self.layers.len() - 1];
        let output = if last.activation == Activation::Softmax {
            softmax(current.as_slice().unwrap_or(&[]))
        } else {
            current.to_vec()
        };

        Ok(ForwardTrace { layer_outputs, output })
    }
}

/// Numerically stable softmax.
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

struct RawTensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

/// Read a tensor by name, widening F16/BF16 to f32.
fn read_tensor(tensors: &safetensors::SafeTensors<'_>, name: &str) -> Result<RawTensor> {
    let tensor = tensors.tensor(name).map_err(|e| SaqueError::Serialization {
        message: format!("failed to read tensor '{name}': {e}"),
    })?;

    let shape: Vec<usize> = tensor.shape().to_vec();
    let values: Vec<f32> = match tensor.dtype() {
        safetensors::Dtype::F32 => bytemuck::cast_slice(tensor.data()).to_vec(),
        safetensors::Dtype::F16 => {
            let halfs: &[u16] = bytemuck::cast_slice(tensor.data());
            halfs.iter().map(|&h| half::f16::from_bits(h).to_f32()).collect()
        }
        safetensors::Dtype::BF16 => {
            let bits: &[u16] = bytemuck::cast_slice(tensor.data());
            bits.iter().map(|&b| half::bf16::from_bits(b).to_f32()).collect()
        }
        other => {
            return Err(SaqueError::UnsupportedFormat {
                format: format!("tensor dtype {other:?}"),
            });
        }
    };

    Ok(RawTensor { shape, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    /// Write a two-layer test model (4 → 3 → 2) and return its path.
    pub(crate) fn write_test_model(dir: &Path) -> std::path::PathBuf {
        use safetensors::tensor::{Dtype, TensorView};

        let w0: Vec<f32> = vec![
            0.5, -0.25, 0.1, 0.0, //
            -0.3, 0.2, 0.4, -0.1, //
            0.05, 0.15, -0.2, 0.35,
        ];
        let b0: Vec<f32> = vec![0.1, -0.05, 0.0];
        let w1: Vec<f32> = vec![
            0.6, -0.4, 0.2, //
            -0.1, 0.3, -0.5,
        ];
        let b1: Vec<f32> = vec![0.05, -0.02];

        let w0_bytes: Vec<u8> = bytemuck::cast_slice(&w0).to_vec();
        let b0_bytes: Vec<u8> = bytemuck::cast_slice(&b0).to_vec();
        let w1_bytes: Vec<u8> = bytemuck::cast_slice(&w1).to_vec();
        let b1_bytes: Vec<u8> = bytemuck::cast_slice(&b1).to_vec();

        let views = vec![
            ("dense_0.weight", TensorView::new(Dtype::F32, vec![3, 4], &w0_bytes).unwrap()),
            ("dense_0.bias", TensorView::new(Dtype::F32, vec![3], &b0_bytes).unwrap()),
            ("dense_1.weight", TensorView::new(Dtype::F32, vec![2, 3], &w1_bytes).unwrap()),
            ("dense_1.bias", TensorView::new(Dtype::F32, vec![2], &b1_bytes).unwrap()),
        ];

        let path = dir.join("model.safetensors");
        std::fs::write(&path, safetensors::serialize(views, &None).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_two_layer_model() {
        let tmp = TempDir::new().unwrap();
        let path = write_test_model(tmp.path());

        let model = MlpModel::from_safetensors(&path).unwrap();

        assert_eq!(model.num_layers(), 2);
        assert_eq!(model.input_dim(), 4);
        assert_eq!(model.output_dim(), 2);
        assert_eq!(model.layers()[0].activation, Activation::Relu);
        assert_eq!(model.layers()[1].activation, Activation::Softmax);
    }

    #[test]
    fn test_missing_model_file() {
        let result = MlpModel::from_safetensors("/nonexistent/model.safetensors");
        assert!(matches!(result, Err(SaqueError::ModelNotFound { .. })));
    }

    #[test]
    fn test_invalid_safetensors_data() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.safetensors");
        std::fs::write(&path, b"not a safetensors file").unwrap();

        let result = MlpModel::from_safetensors(&path);
        assert!(matches!(result, Err(SaqueError::Serialization { .. })));
    }

    #[test]
    fn test_no_dense_tensors() {
        use safetensors::tensor::{Dtype, TensorView};

        let tmp = TempDir::new().unwrap();
        let data: Vec<f32> = vec![1.0, 2.0];
        let bytes: Vec<u8> = bytemuck::cast_slice(&data).to_vec();
        let views = vec![(
            "embedding.weight",
            TensorView::new(Dtype::F32, vec![2], &bytes).unwrap(),
        )];
        let path = tmp.path().join("other.safetensors");
        std::fs::write(&path, safetensors::serialize(views, &None).unwrap()).unwrap();

        let result = MlpModel::from_safetensors(&path);
        assert!(matches!(result, Err(SaqueError::Serialization { .. })));
    }

    #[test]
    fn test_bias_shape_mismatch() {
        use safetensors::tensor::{Dtype, TensorView};

        let tmp = TempDir::new().unwrap();
        let w: Vec<f32> = vec![0.0; 6];
        let b: Vec<f32> = vec![0.0; 4]; // wrong: layer has 3 outputs
        let w_bytes: Vec<u8> = bytemuck::cast_slice(&w).to_vec();
        let b_bytes: Vec<u8> = bytemuck::cast_slice(&b).to_vec();
        let views = vec![
            ("dense_0.weight", TensorView::new(Dtype::F32, vec![3, 2], &w_bytes).unwrap()),
            ("dense_0.bias", TensorView::new(Dtype::F32, vec![4], &b_bytes).unwrap()),
        ];
        let path = tmp.path().join("bad_bias.safetensors");
        std::fs::write(&path, safetensors::serialize(views, &None).unwrap()).unwrap();

        let result = MlpModel::from_safetensors(&path);
        assert!(matches!(result, Err(SaqueError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_layer_chain_mismatch() {
        let l0 = DenseLayer {
            weights: Array2::zeros((3, 4)),
            bias: Array1::zeros(3),
            activation: Activation::Relu,
        };
        let l1 = DenseLayer {
            weights: Array2::zeros((2, 5)), // expects 5 inputs, gets 3
            bias: Array1::zeros(2),
            activation: Activation::Softmax,
        };

        let result = MlpModel::new(vec![l0, l1]);
        assert!(matches!(result, Err(SaqueError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_forward_known_values() {
        // Single layer, identity-ish weights, no hidden activation surprises.
        let layer = DenseLayer {
            weights: Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
            bias: Array1::from_vec(vec![0.0, 0.0]),
            activation: Activation::None,
        };
        let model = MlpModel::new(vec![layer]).unwrap();

        let out = model.forward(&[3.0, -2.0]).unwrap();
        assert_abs_diff_eq!(out[0], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_forward_wrong_width() {
        let tmp = TempDir::new().unwrap();
        let model = MlpModel::from_safetensors(write_test_model(tmp.path())).unwrap();

        let result = model.forward(&[1.0, 2.0]); // model expects 4 features
        assert!(matches!(result, Err(SaqueError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_softmax_output_sums_to_one() {
        let tmp = TempDir::new().unwrap();
        let model = MlpModel::from_safetensors(write_test_model(tmp.path())).unwrap();

        let out = model.forward(&[0.5, -1.0, 2.0, 0.0]).unwrap();
        let sum: f32 = out.iter().sum();

        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        assert!(out.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_forward_trace_records_every_layer() {
        let tmp = TempDir::new().unwrap();
        let model = MlpModel::from_safetensors(write_test_model(tmp.path())).unwrap();

        let trace = model.forward_trace(&[1.0, 0.0, -1.0, 0.5]).unwrap();

        assert_eq!(trace.layer_outputs.len(), 2);
        assert_eq!(trace.layer_outputs[0].len(), 3);
        assert_eq!(trace.layer_outputs[1].len(), 2);
        // Hidden layer is post-ReLU: no negatives.
        assert!(trace.layer_outputs[0].iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_f16_tensors_widen() {
        use safetensors::tensor::{Dtype, TensorView};

        let tmp = TempDir::new().unwrap();
        let w_half: Vec<u16> = [1.0f32, -0.5, 0.25, 0.0]
            .iter()
            .map(|&v| half::f16::from_f32(v).to_bits())
            .collect();
        let b_half: Vec<u16> = [0.0f32, 0.0].iter().map(|&v| half::f16::from_f32(v).to_bits()).collect();
        let w_bytes: Vec<u8> = bytemuck::cast_slice(&w_half).to_vec();
        let b_bytes: Vec<u8> = bytemuck::cast_slice(&b_half).to_vec();

        let views = vec![
            ("dense_0.weight", TensorView::new(Dtype::F16, vec![2, 2], &w_bytes).unwrap()),
            ("dense_0.bias", TensorView::new(Dtype::F16, vec![2], &b_bytes).unwrap()),
        ];
        let path = tmp.path().join("half.safetensors");
        std::fs::write(&path, safetensors::serialize(views, &None).unwrap()).unwrap();

        let model = MlpModel::from_safetensors(&path).unwrap();
        assert_abs_diff_eq!(model.layers()[0].weights[[0, 0]], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(model.layers()[0].weights[[0, 1]], -0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_activation_codes_round_trip() {
        for act in [Activation::None, Activation::Relu, Activation::Softmax] {
            assert_eq!(Activation::from_code(act.code()).unwrap(), act);
        }
        assert!(Activation::from_code(9).is_err());
    }
}
