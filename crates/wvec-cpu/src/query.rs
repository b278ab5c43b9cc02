//! Nearest-neighbour and analogy queries over input embeddings
//!
//! Similarity is cosine over `W_in` columns. A zero vector has similarity 0
//! with everything.

use crate::kernels::{axpy, dot, nrm2, scal};
use wvec_core::{Model, ModelState, Result};

/// A ranked query result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub word_id: i32,
    pub similarity: f32,
}

/// Scale `v` to unit length in place; zero vectors stay zero.
fn normalize(v: &mut [f32]) {
    let norm = nrm2(v);
    if norm > 0.0 {
        scal(1.0 / norm, v);
    }
}

/// Rank every word not in `exclude` by cosine similarity to the unit vector `query`.
fn rank(model: &Model, query: &[f32], exclude: &[usize], top_k: usize) -> Vec<Neighbor> {
    let mut column = vec![0.0; model.dim()];
    let mut scored: Vec<Neighbor> = Vec::with_capacity(model.vocab_size());

    for idx in (0..model.vocab_size()).filter(|idx| !exclude.contains(idx)) {
        model.input().load_column(idx, &mut column);
        normalize(&mut column);
        scored.push(Neighbor { word_id: idx as i32, similarity: dot(query, &column) });
    }

    scored.sort_by(|a, b| {
        b.similarity.total_cmp(&a.similarity).then_with(|| a.word_id.cmp(&b.word_id))
    });
    scored.truncate(top_k);
    scored
}

/// The `top_k` words most similar to `word_id`, excluding itself.
pub fn most_similar(state: &ModelState, word_id: i32, top_k: usize) -> Result<Vec<Neighbor>> {
    let model = state.model()?;
    let idx = model.word_index(word_id)?;

    let mut query = vec![0.0; model.dim()];
    model.input().load_column(idx, &mut query);
    normalize(&mut query);

    Ok(rank(model, &query, &[idx], top_k))
}

/// Words closest to `b - a + c` ("a is to b as c is to ?"), excluding `a`, `b` and `c`.
pub fn analogy(
    state: &ModelState,
    a: i32,
    b: i32,
    c: i32,
    top_k: usize,
) -> Result<Vec<Neighbor>> {
    let model = state.model()?;
    let ids = [model.word_index(a)?, model.word_index(b)?, model.word_index(c)?];

    let dim = model.dim();
    let mut query = vec![0.0; dim];
    let mut column = vec![0.0; dim];
    for (&idx, sign) in ids.iter().zip([-1.0, 1.0, 1.0]) {
        model.input().load_column(idx, &mut column);
        normalize(&mut column);
        axpy(sign, &column, &mut query);
    }
    normalize(&mut query);

    Ok(rank(model, &query, &ids, top_k))
}
