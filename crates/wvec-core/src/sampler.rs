//! Negative-sample slot selection
//!
//! Negatives are not drawn from an RNG. The slot in the (externally built)
//! unigram table is a pure hash of the center position `i`, the context
//! position `j` and the draw index `k`:
//!
//! `slot(i, j, k) = (7*i + 13*j + 17*k) mod table_size`
//!
//! Positions are 0-based token offsets, draws run `k = 1..=n_neg`, and the
//! result is a 0-based table offset. The same arguments always give the same
//! slot, whatever the thread count or visiting order.

/// Table offset for draw `k` of pair `(i, j)`. `table_size` must be > 0.
#[inline]
pub fn slot(i: usize, j: usize, k: usize, table_size: usize) -> usize {
    let h = (i as u128) * 7 + (j as u128) * 13 + (k as u128) * 17;
    (h % table_size as u128) as usize
}
