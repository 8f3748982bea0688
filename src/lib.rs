//! Core library for the saque toolchain.
//!
//! saque turns trained swing classifiers into quantized artifacts small
//! enough to live in microcontroller flash:
//! - load a SafeTensors classifier and its feature scaler
//! - calibrate 8-bit quantization over a synthetic representative dataset
//! - encode a flat binary artifact with f32 input/output
//! - verify the artifact with a quantized inference smoke test
//!
//! The CLI pipelines live in `saque-export` (model → artifact) and
//! `saque-embed` (artifact → C header).
//!
//! # Toyota Way Principles
//!
//! - **Jidoka**: dimension preconditions are checked before calibration,
//!   never assumed
//! - **Genchi Genbutsu**: the smoke test runs the actual encoded artifact,
//!   not the in-memory model
//! - **Poka-yoke**: the artifact decoder rejects truncated or trailing bytes

pub mod artifact;
pub mod calibration;
pub mod infer;
pub mod model;
pub mod quant;
pub mod scaler;
pub mod staging;

pub use artifact::{decode, encode};
pub use calibration::{representative_dataset, ActivationStats, Calibrator};
pub use infer::{Interpreter, SmokeReport};
pub use model::{Activation, DenseLayer, MlpModel};
pub use quant::{quantize_model, QuantParams, QuantizedLayer, QuantizedModel};
pub use scaler::FeatureScaler;
