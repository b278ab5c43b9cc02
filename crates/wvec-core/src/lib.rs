//! Core building blocks for wvec
//!
//! This crate provides the state the skip-gram trainer works on:
//! - Error taxonomy shared by every wvec crate
//! - Lock-free embedding matrices and the model lifecycle
//! - The deterministic negative-sample slot function
//! - The WVCK checkpoint format

pub mod error;
pub mod formats;
pub mod matrix;
pub mod model;
pub mod sampler;

pub use error::{Error, Result};
pub use formats::checkpoint::{CheckpointHeader, CHECKPOINT_MAGIC, CHECKPOINT_VERSION};
pub use matrix::{EmbeddingMatrix, Real};
pub use model::{word_index, InitConfig, Model, ModelState, OutputInit};

/// Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
