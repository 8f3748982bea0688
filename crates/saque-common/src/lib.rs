//! Shared infrastructure for saque CLI tools.
//!
//! This crate provides common utilities used across all saque sub-crates:
//! - CLI argument handling and output styling
//! - Error handling with actionable diagnostics
//!
//! # Toyota Way Principles
//!
//! - **Jidoka**: Rich error messages with actionable diagnostics
//! - **Andon**: Visual problem indication through consistent styling
//! - **Muda Elimination**: Single source of truth for shared code

pub mod cli;
pub mod error;

pub use cli::{Cli, CommonArgs, OutputFormat};
pub use error::{Result, SaqueError};
