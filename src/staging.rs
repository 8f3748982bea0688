//! Intermediate staged model representation.
//!
//! The quantizer consumes a directory-based form of the model rather than
//! the in-memory load: `weights.safetensors` plus a `manifest.json` naming
//! each layer's dims and activation. Callers own the directory's lifetime;
//! the export pipeline stages into a `tempfile::TempDir` so the directory
//! is removed on every exit path.

use crate::model::{Activation, MlpModel};
use safetensors::tensor::{Dtype, TensorView};
use saque_common::{Result, SaqueError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Staged weights file name.
pub const WEIGHTS_FILE: &str = "weights.safetensors";

/// Staged manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    layers: Vec<ManifestLayer>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestLayer {
    name: String,
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
}

/// Write the model into `dir` as a staged representation.
pub fn stage_model(model: &MlpModel, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| SaqueError::Io {
        context: format!("creating staging directory: {}", dir.display()),
        source: e,
    })?;

    // Owned byte buffers must outlive the tensor views handed to serialize.
    let mut buffers: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();
    for (index, layer) in model.layers().iter().enumerate() {
        let weight_values: Vec<f32> = layer.weights.iter().copied().collect();
        buffers.push((
            format!("dense_{index}.weight"),
            vec![layer.out_dim(), layer.in_dim()],
            bytemuck::cast_slice(&weight_values).to_vec(),
        ));

        let bias_values: Vec<f32> = layer.bias.iter().copied().collect();
        buffers.push((
            format!("dense_{index}.bias"),
            vec![layer.out_dim()],
            bytemuck::cast_slice(&bias_values).to_vec(),
        ));
    }

    let mut views = Vec::with_capacity(buffers.len());
    for (name, shape, bytes) in &buffers {
        let view = TensorView::new(Dtype::F32, shape.clone(), bytes).map_err(|e| {
            SaqueError::Serialization {
                message: format!("staging tensor '{name}': {e}"),
            }
        })?;
        views.push((name.as_str(), view));
    }

    let serialized =
        safetensors::serialize(views, &None).map_err(|e| SaqueError::Serialization {
            message: format!("staging weights: {e}"),
        })?;

    let weights_path = dir.join(WEIGHTS_FILE);
    std::fs::write(&weights_path, serialized).map_err(|e| SaqueError::Io {
        context: format!("writing staged weights: {}", weights_path.display()),
        source: e,
    })?;

    let manifest = Manifest {
        version: 1,
        layers: model
            .layers()
            .iter()
            .enumerate()
            .map(|(index, layer)| ManifestLayer {
                name: format!("dense_{index}"),
                in_dim: layer.in_dim(),
                out_dim: layer.out_dim(),
                activation: layer.activation,
            })
            .collect(),
    };

    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|e| SaqueError::Serialization {
            message: format!("staging manifest: {e}"),
        })?;
    std::fs::write(&manifest_path, manifest_json).map_err(|e| SaqueError::Io {
        context: format!("writing staged manifest: {}", manifest_path.display()),
        source: e,
    })?;

    Ok(())
}

/// Load a staged model back from `dir`.
pub fn load_staged(dir: &Path) -> Result<MlpModel> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(SaqueError::Serialization {
            message: format!("staged model missing manifest: {}", manifest_path.display()),
        });
    }

    let manifest_json =
        std::fs::read_to_string(&manifest_path).map_err(|e| SaqueError::Io {
            context: format!("reading staged manifest: {}", manifest_path.display()),
            source: e,
        })?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_json).map_err(|e| SaqueError::Serialization {
            message: format!("invalid staged manifest {}: {e}", manifest_path.display()),
        })?;

    let weights_path = dir.join(WEIGHTS_FILE);
    if !weights_path.exists() {
        return Err(SaqueError::Serialization {
            message: format!("staged model missing weights: {}", weights_path.display()),
        });
    }

    let model = MlpModel::from_safetensors(&weights_path)?;

    if manifest.layers.len() != model.num_layers() {
        return Err(SaqueError::Serialization {
            message: format!(
                "staged manifest lists {} layers, weights contain {}",
                manifest.layers.len(),
                model.num_layers()
            ),
        });
    }

    // The manifest is authoritative for activations; dims must agree with
    // the weight tensors.
    let mut layers = model.into_layers();
    for (layer, entry) in layers.iter_mut().zip(manifest.layers.iter()) {
        if layer.in_dim() != entry.in_dim || layer.out_dim() != entry.out_dim {
            return Err(SaqueError::ShapeMismatch {
                expected: vec![entry.out_dim, entry.in_dim],
                actual: vec![layer.out_dim(), layer.in_dim()],
            });
        }
        layer.activation = entry.activation;
    }

    MlpModel::new(layers)
}
