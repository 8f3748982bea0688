//! Quantized inference engine.
//!
//! Executes the artifact the way the firmware interpreter does: i8 tensors,
//! i32/i64 accumulators, requantization between layers. The external
//! interface is f32 on both ends. ReLU runs in the quantized domain (clamp
//! at the output zero point); Softmax has no integer kernel and runs in
//! float on the dequantized logits.

use crate::artifact;
use crate::model::{softmax, Activation};
use crate::quant::{QuantizedModel, QMAX, QMIN};
use saque_common::{Result, SaqueError};

/// Result of a successful smoke test, for human inspection.
#[derive(Debug, Clone)]
pub struct SmokeReport {
    /// Full output vector
    pub output: Vec<f32>,
    /// Sum of the output vector
    pub sum: f32,
}

/// Interpreter over a decoded quantized model.
pub struct Interpreter {
    model: QuantizedModel,
}

impl Interpreter {
    /// Wrap an already-decoded model.
    pub fn new(model: QuantizedModel) -> Self {
        Self { model }
    }

    /// Decode an artifact buffer and build an interpreter over it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(artifact::decode(bytes)?))
    }

    /// Number of input features.
    pub fn input_dim(&self) -> usize {
        self.model.input_dim()
    }

    /// Number of output classes.
    pub fn output_dim(&self) -> usize {
        self.model.output_dim()
    }

    /// Run one input vector through the quantized graph.
    pub fn invoke(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.model.input_dim() {
            return Err(SaqueError::ShapeMismatch {
                expected: vec![self.model.input_dim()],
                actual: vec![input.len()],
            });
        }

        let mut current: Vec<i8> = input.iter().map(|&x| self.model.input.quantize(x)).collect();
        let mut in_params = self.model.input;

        for layer in &self.model.layers {
            let multiplier = layer.weight_scale * in_params.scale / layer.output.scale;
            // Fused ReLU clamps at the zero point; the calibrated output
            // range of a ReLU layer starts at 0.
            let q_low = if layer.activation == Activation::Relu {
                layer.output.zero_point
            } else {
                QMIN
            };

            let mut next = Vec::with_capacity(layer.out_dim);
            for o in 0..layer.out_dim {
                let row = &layer.weights[o * layer.in_dim..(o + 1) * layer.in_dim];
                let mut acc: i64 = i64::from(layer.bias[o]);
                for (&w, &x) in row.iter().zip(current.iter()) {
                    acc += i64::from(w) * i64::from(i32::from(x) - in_params.zero_point);
                }

                let scaled = (acc as f32 * multiplier).round() as i32 + layer.output.zero_point;
                next.push(scaled.clamp(q_low, QMAX) as i8);
            }

            current = next;
            in_params = layer.output;
        }

        let last = &self.model.layers[self.model.layers.len() - 1];
        let logits: Vec<f32> = current.iter().map(|&q| last.output.dequantize(q)).collect();

        Ok(if last.activation == Activation::Softmax {
            softmax(&logits)
        } else {
            logits
        })
    }

    /// Run one input and fail on any NaN in the output.
    ///
    /// The output vector and its sum are reported for inspection; they are
    /// not asserted against expected values.
    pub fn smoke_test(&self, input: &[f32]) -> Result<SmokeReport> {
        let output = self.invoke(input)?;

        if let Some(index) = output.iter().position(|v| v.is_nan()) {
            return Err(SaqueError::NanOutput { index });
        }

        let sum = output.iter().sum();
        Ok(SmokeReport { output, sum })
    }
}
