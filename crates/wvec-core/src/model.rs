//! Embedding model and its lifecycle
//!
//! `Model` owns the input (`W_in`) and output (`W_out`) matrices. `ModelState`
//! wraps an optional model and implements the init / free / query contract
//! that the C ABI exposes: an uninitialized state rejects every numeric
//! operation with `NotInitialized`.
//!
//! Word ids crossing the boundary are `i32` and 0-indexed. `word_index` is
//! the only place they become column indices; every accessor goes through it.

use crate::error::{Error, Result};
use crate::matrix::EmbeddingMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How `W_out` is filled at init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputInit {
    /// All zeros (word2vec convention)
    #[default]
    Zeros,
    /// Same uniform range as `W_in`, independent draws
    Uniform,
}

/// Parameters for `ModelState::init`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConfig {
    #[serde(default)]
    pub output_init: OutputInit,
    /// Fixed seed for reproducible weights; `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Validate a boundary word id and convert it to a column index.
pub fn word_index(word_id: i32, vocab_size: usize) -> Result<usize> {
    usize::try_from(word_id).ok().filter(|&idx| idx < vocab_size).ok_or_else(|| {
        Error::InvalidSize(format!("word id {} outside [0, {})", word_id, vocab_size))
    })
}

fn positive_dim(value: i32, what: &str) -> Result<usize> {
    if value <= 0 {
        return Err(Error::InvalidSize(format!("{} must be > 0, got {}", what, value)));
    }
    Ok(value as usize)
}

/// Input and output embedding matrices of identical shape.
pub struct Model {
    vocab_size: usize,
    dim: usize,
    w_in: EmbeddingMatrix,
    w_out: EmbeddingMatrix,
}

impl Model {
    /// Random `W_in` in `[-0.5/dim, 0.5/dim)`, `W_out` per `config.output_init`.
    pub fn random(vocab_size: usize, dim: usize, config: &InitConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let scale = dim as f32;

        let w_in =
            EmbeddingMatrix::from_fn(dim, vocab_size, |_| (rng.random::<f32>() - 0.5) / scale)?;
        let w_out = match config.output_init {
            OutputInit::Zeros => EmbeddingMatrix::zeros(dim, vocab_size)?,
            OutputInit::Uniform => {
                EmbeddingMatrix::from_fn(dim, vocab_size, |_| (rng.random::<f32>() - 0.5) / scale)?
            }
        };

        Ok(Self { vocab_size, dim, w_in, w_out })
    }

    /// Both matrices zero-filled (filled in afterwards by a loader)
    pub fn zeroed(vocab_size: usize, dim: usize) -> Result<Self> {
        Ok(Self {
            vocab_size,
            dim,
            w_in: EmbeddingMatrix::zeros(dim, vocab_size)?,
            w_out: EmbeddingMatrix::zeros(dim, vocab_size)?,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Input (center word) matrix
    pub fn input(&self) -> &EmbeddingMatrix {
        &self.w_in
    }

    /// Output (context / negative word) matrix
    pub fn output(&self) -> &EmbeddingMatrix {
        &self.w_out
    }

    pub fn word_index(&self, word_id: i32) -> Result<usize> {
        word_index(word_id, self.vocab_size)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.dim {
            return Err(Error::InvalidSize(format!(
                "buffer length {} does not match dim {}",
                len, self.dim
            )));
        }
        Ok(())
    }

    /// Copy the input vector of `word_id` into `out`.
    pub fn input_vector(&self, word_id: i32, out: &mut [f32]) -> Result<()> {
        self.check_len(out.len())?;
        self.w_in.load_column(self.word_index(word_id)?, out);
        Ok(())
    }

    /// Copy the output vector of `word_id` into `out`.
    pub fn output_vector(&self, word_id: i32, out: &mut [f32]) -> Result<()> {
        self.check_len(out.len())?;
        self.w_out.load_column(self.word_index(word_id)?, out);
        Ok(())
    }

    pub fn set_input_vector(&mut self, word_id: i32, values: &[f32]) -> Result<()> {
        self.check_len(values.len())?;
        self.w_in.store_column(self.word_index(word_id)?, values);
        Ok(())
    }

    pub fn set_output_vector(&mut self, word_id: i32, values: &[f32]) -> Result<()> {
        self.check_len(values.len())?;
        self.w_out.store_column(self.word_index(word_id)?, values);
        Ok(())
    }
}

/// The live model slot: `None` until `init` or a checkpoint load succeeds.
#[derive(Default)]
pub struct ModelState {
    model: Option<Model>,
}

impl ModelState {
    pub const fn new() -> Self {
        Self { model: None }
    }

    /// Replace any existing model with a freshly initialized one.
    ///
    /// Non-positive sizes are rejected before anything is freed or allocated.
    /// If allocation fails the state is left uninitialized.
    pub fn init(&mut self, vocab_size: i32, dim: i32, config: &InitConfig) -> Result<()> {
        let vocab = positive_dim(vocab_size, "vocab_size")?;
        let dim = positive_dim(dim, "dim")?;

        self.free();
        let model = Model::random(vocab, dim, config)?;
        log::info!(
            "Initialized model: vocab_size={}, dim={}, output_init={:?}",
            vocab,
            dim,
            config.output_init
        );
        self.model = Some(model);
        Ok(())
    }

    /// Drop the model. No-op when already uninitialized.
    pub fn free(&mut self) {
        if let Some(model) = self.model.take() {
            log::debug!("Freed model: vocab_size={}, dim={}", model.vocab_size, model.dim);
        }
    }

    pub fn is_init(&self) -> bool {
        self.model.is_some()
    }

    /// `(vocab_size, dim)`, or `(0, 0)` when uninitialized
    pub fn dims(&self) -> (i32, i32) {
        match &self.model {
            Some(m) => (
                i32::try_from(m.vocab_size).unwrap_or(i32::MAX),
                i32::try_from(m.dim).unwrap_or(i32::MAX),
            ),
            None => (0, 0),
        }
    }

    /// Copy the input vector of `word_id` into `out`.
    pub fn embedding(&self, word_id: i32, out: &mut [f32]) -> Result<()> {
        self.model()?.input_vector(word_id, out)
    }

    pub fn model(&self) -> Result<&Model> {
        self.model.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn model_mut(&mut self) -> Result<&mut Model> {
        self.model.as_mut().ok_or(Error::NotInitialized)
    }

    /// Install a fully built model, dropping the previous one.
    pub fn install(&mut self, model: Model) {
        self.model = Some(model);
    }
}
