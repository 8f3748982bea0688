//! Flat binary artifact codec.
//!
//! The artifact is the byte buffer embedded into firmware. Layout, all
//! little-endian:
//!
//! ```text
//! magic      [u8; 4]  = "SQM1"
//! version    u16      = 1
//! reserved   u16      = 0
//! input_dim  u32
//! num_layers u32
//! input quant params: scale f32, zero_point i32
//! per layer:
//!   in_dim u32, out_dim u32
//!   activation u8, pad [u8; 3]
//!   weight_scale f32
//!   output quant params: scale f32, zero_point i32
//!   bias    [i32; out_dim]
//!   weights [i8; out_dim * in_dim]   (row-major)
//! ```
//!
//! Decoding validates magic, version, layer chaining, and exact buffer
//! length; trailing or missing bytes are errors, never silently ignored.

use crate::model::Activation;
use crate::quant::{QuantParams, QuantizedLayer, QuantizedModel};
use saque_common::{Result, SaqueError};

/// Artifact file magic.
pub const MAGIC: [u8; 4] = *b"SQM1";

/// Artifact format version.
pub const VERSION: u16 = 1;

/// Artifact file extension.
pub const EXTENSION: &str = "sqm";

/// Encode a quantized model into the flat artifact buffer.
pub fn encode(model: &QuantizedModel) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(model.input_dim() as u32).to_le_bytes());
    out.extend_from_slice(&(model.num_layers() as u32).to_le_bytes());
    out.extend_from_slice(&model.input.scale.to_le_bytes());
    out.extend_from_slice(&model.input.zero_point.to_le_bytes());

    for layer in &model.layers {
        out.extend_from_slice(&(layer.in_dim as u32).to_le_bytes());
        out.extend_from_slice(&(layer.out_dim as u32).to_le_bytes());
        out.push(layer.activation.code());
        out.extend_from_slice(&[0u8; 3]);
        out.extend_from_slice(&layer.weight_scale.to_le_bytes());
        out.extend_from_slice(&layer.output.scale.to_le_bytes());
        out.extend_from_slice(&layer.output.zero_point.to_le_bytes());
        for &b in &layer.bias {
            out.extend_from_slice(&b.to_le_bytes());
        }
        out.extend_from_slice(bytemuck::cast_slice(&layer.weights));
    }

    out
}

/// Decode an artifact buffer back into a quantized model.
pub fn decode(bytes: &[u8]) -> Result<QuantizedModel> {
    let mut r = Reader::new(bytes);

    let magic = r.take(4)?;
    if magic != MAGIC {
        return Err(SaqueError::Serialization {
            message: "not a saque artifact (bad magic)".to_string(),
        });
    }

    let version = r.read_u16()?;
    if version != VERSION {
        return Err(SaqueError::Serialization {
            message: format!("unsupported artifact version {version} (expected {VERSION})"),
        });
    }
    let _reserved = r.read_u16()?;

    let input_dim = r.read_u32()? as usize;
    let num_layers = r.read_u32()? as usize;
    if input_dim == 0 || num_layers == 0 {
        return Err(SaqueError::Serialization {
            message: format!("degenerate artifact: input_dim={input_dim}, layers={num_layers}"),
        });
    }

    let input = QuantParams { scale: r.read_f32()?, zero_point: r.read_i32()? };

    let mut layers = Vec::with_capacity(num_layers);
    let mut expected_in = input_dim;

    for index in 0..num_layers {
        let in_dim = r.read_u32()? as usize;
        let out_dim = r.read_u32()? as usize;
        if in_dim != expected_in || out_dim == 0 {
            return Err(SaqueError::Serialization {
                message: format!(
                    "layer {index}: dims [{out_dim}, {in_dim}] do not chain from width {expected_in}"
                ),
            });
        }

        let activation = Activation::from_code(r.read_u8()?)?;
        r.take(3)?; // pad

        let weight_scale = r.read_f32()?;
        let output = QuantParams { scale: r.read_f32()?, zero_point: r.read_i32()? };

        let mut bias = Vec::with_capacity(out_dim);
        for _ in 0..out_dim {
            bias.push(r.read_i32()?);
        }

        let weight_bytes = r.take(out_dim * in_dim)?;
        let weights: Vec<i8> = bytemuck::cast_slice(weight_bytes).to_vec();

        layers.push(QuantizedLayer {
            in_dim,
            out_dim,
            activation,
            weight_scale,
            output,
            bias,
            weights,
        });
        expected_in = out_dim;
    }

    r.finish()?;

    Ok(QuantizedModel { input, layers })
}

/// Bounds-checked little-endian reader over the artifact buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| SaqueError::Serialization {
            message: "artifact length overflow".to_string(),
        })?;
        if end > self.bytes.len() {
            return Err(SaqueError::Serialization {
                message: format!(
                    "truncated artifact: need {n} bytes at offset {}, have {}",
                    self.pos,
                    self.bytes.len() - self.pos
                ),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(SaqueError::Serialization {
                message: format!(
                    "trailing bytes in artifact: {} past end of model",
                    self.bytes.len() - self.pos
                ),
            });
        }
        Ok(())
    }
}
