//! Skip-gram with negative sampling
//!
//! `train_pair` applies the update for one (center, context) pair and its
//! negatives. `train_corpus` slides a window over a token stream and calls the
//! same update from a rayon pool. Workers write the shared matrices without
//! locks; see `wvec_core::matrix` for what that guarantees.
//!
//! Update order for one pair, with `c` the center's input vector:
//!
//! 1. for the context and then each negative `t` (in order):
//!    `g = (label - sigmoid(c . t)) * lr`, `grad += g * t`, `t += g * c`
//! 2. `c += grad`
//!
//! Every target update uses the center as it was before step 2, and `grad`
//! always sees the target before its own update. This order is part of the
//! reproducibility contract and must not be rearranged.

use crate::kernels::{axpy, dot, sigmoid};
use rayon::prelude::*;
use wvec_core::sampler::slot;
use wvec_core::{Error, Model, ModelState, Result};

/// Token positions handed to a worker at a time
pub const CHUNK_SIZE: usize = 1000;

/// Per-worker buffers, sized to `dim`
pub struct PairScratch {
    center: Vec<f32>,
    grad: Vec<f32>,
    target: Vec<f32>,
}

impl PairScratch {
    pub fn new(dim: usize) -> Self {
        Self { center: vec![0.0; dim], grad: vec![0.0; dim], target: vec![0.0; dim] }
    }
}

/// Counts from one `train_corpus` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub positions: usize,
    pub pairs: u64,
}

/// One positive or negative target
#[inline]
fn update_target(
    model: &Model,
    target: usize,
    label: f32,
    learning_rate: f32,
    scratch: &mut PairScratch,
) {
    let w_out = model.output();
    w_out.load_column(target, &mut scratch.target);

    let score = dot(&scratch.center, &scratch.target);
    let g = (label - sigmoid(score)) * learning_rate;

    axpy(g, &scratch.target, &mut scratch.grad);
    w_out.axpy_column(target, g, &scratch.center);
}

/// Update rule on validated column indices.
pub fn update_pair(
    model: &Model,
    center: usize,
    context: usize,
    negatives: &[usize],
    learning_rate: f32,
    scratch: &mut PairScratch,
) {
    model.input().load_column(center, &mut scratch.center);
    scratch.grad.fill(0.0);

    update_target(model, context, 1.0, learning_rate, scratch);
    for &neg in negatives {
        update_target(model, neg, 0.0, learning_rate, scratch);
    }

    model.input().add_column(center, &scratch.grad);
}

/// Train one (center, context) pair against `neg_ids`.
///
/// All ids are validated before any weight is written.
pub fn train_pair(
    state: &ModelState,
    center_id: i32,
    context_id: i32,
    neg_ids: &[i32],
    learning_rate: f32,
) -> Result<()> {
    let model = state.model()?;

    let center = model.word_index(center_id)?;
    let context = model.word_index(context_id)?;
    let negatives =
        neg_ids.iter().map(|&id| model.word_index(id)).collect::<Result<Vec<_>>>()?;

    let mut scratch = PairScratch::new(model.dim());
    update_pair(model, center, context, &negatives, learning_rate, &mut scratch);
    Ok(())
}

fn check_ids(ids: &[i32], vocab_size: usize, what: &str) -> Result<()> {
    match ids.iter().position(|&id| id < 0 || id as usize >= vocab_size) {
        Some(pos) => Err(Error::InvalidSize(format!(
            "{}[{}] = {} outside [0, {})",
            what, pos, ids[pos], vocab_size
        ))),
        None => Ok(()),
    }
}

/// Train every (center, context) pair within `window` positions.
///
/// For position `i` and context position `j`, negative `k` (1-based) is
/// `neg_table[slot(i, j, k, table_size)]`. The pool is whatever rayon pool
/// the call runs in; chunks of `CHUNK_SIZE` positions are stolen dynamically.
///
/// Arguments are validated up front so an invalid call performs no updates.
pub fn train_corpus(
    state: &ModelState,
    token_ids: &[i32],
    window: i32,
    n_neg: i32,
    neg_table: &[i32],
    table_size: i32,
    learning_rate: f32,
) -> Result<CorpusStats> {
    let model = state.model()?;
    let vocab_size = model.vocab_size();

    if window < 0 {
        return Err(Error::InvalidSize(format!("window must be >= 0, got {}", window)));
    }
    if n_neg < 0 {
        return Err(Error::InvalidSize(format!("n_neg must be >= 0, got {}", n_neg)));
    }
    let n_neg = n_neg as usize;

    let table: &[i32] = if n_neg == 0 {
        &[]
    } else {
        if table_size <= 0 || table_size as usize > neg_table.len() {
            return Err(Error::InvalidSize(format!(
                "table_size {} outside [1, {}]",
                table_size,
                neg_table.len()
            )));
        }
        &neg_table[..table_size as usize]
    };

    check_ids(token_ids, vocab_size, "token_ids")?;
    check_ids(table, vocab_size, "neg_table")?;

    let n = token_ids.len();
    if n == 0 {
        return Ok(CorpusStats::default());
    }

    let window = window as usize;
    let dim = model.dim();
    let n_chunks = n.div_ceil(CHUNK_SIZE);

    let pairs: u64 = (0..n_chunks)
        .into_par_iter()
        .map_init(
            || (PairScratch::new(dim), vec![0usize; n_neg]),
            |(scratch, negatives), chunk| {
                let start = chunk * CHUNK_SIZE;
                let end = (start + CHUNK_SIZE).min(n);
                let mut pairs = 0u64;

                for i in start..end {
                    let center = token_ids[i] as usize;
                    let lo = i.saturating_sub(window);
                    let hi = (i + window).min(n - 1);

                    for j in (lo..=hi).filter(|&j| j != i) {
                        for (k, neg) in negatives.iter_mut().enumerate() {
                            *neg = table[slot(i, j, k + 1, table.len())] as usize;
                        }
                        let context = token_ids[j] as usize;
                        update_pair(model, center, context, negatives, learning_rate, scratch);
                        pairs += 1;
                    }
                }
                pairs
            },
        )
        .sum();

    log::debug!(
        "train_corpus: {} positions, {} pairs, window={}, n_neg={}, lr={}",
        n,
        pairs,
        window,
        n_neg,
        learning_rate
    );

    Ok(CorpusStats { positions: n, pairs })
}
