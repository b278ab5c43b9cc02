//! Lock-free embedding storage
//!
//! Every weight is an `AtomicU32` carrying the bit pattern of an `f32`.
//! Workers read and write columns with relaxed loads and stores, so two
//! threads touching the same column race benignly (an update may be lost)
//! instead of invoking undefined behaviour. This is the Hogwild contract:
//! no locks, no compare-and-swap, no ordering between writers.
//!
//! Storage is column-major: column `j` (one word's vector) occupies
//! `data[j * dim..(j + 1) * dim]`, which is also the on-disk layout.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};

/// One shared `f32` weight.
#[derive(Default)]
#[repr(transparent)]
pub struct Real {
    bits: AtomicU32,
}

impl Real {
    pub fn new(value: f32) -> Self {
        Self { bits: AtomicU32::new(value.to_bits()) }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Load, add, store. Not an atomic read-modify-write.
    #[inline]
    pub fn add(&self, x: f32) {
        let a = self.get();
        self.set(a + x);
    }
}

/// Dense `dim x cols` matrix of shared weights.
pub struct EmbeddingMatrix {
    dim: usize,
    cols: usize,
    data: Box<[Real]>,
}

impl EmbeddingMatrix {
    /// Allocate a zero-filled matrix
    pub fn zeros(dim: usize, cols: usize) -> Result<Self> {
        Self::from_fn(dim, cols, |_| 0.0)
    }

    /// Allocate a matrix whose flat element `i` is `f(i)`, in storage order.
    ///
    /// Allocation failure is reported as `OutOfMemory` rather than aborting.
    pub fn from_fn<F>(dim: usize, cols: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize) -> f32,
    {
        let len = dim.checked_mul(cols).ok_or_else(|| {
            Error::OutOfMemory(format!("{} x {} matrix overflows usize", dim, cols))
        })?;

        let mut data: Vec<Real> = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            Error::OutOfMemory(format!("{} x {} matrix ({} floats): {}", dim, cols, len, e))
        })?;
        data.extend((0..len).map(|i| Real::new(f(i))));

        Ok(Self { dim, cols, data: data.into_boxed_slice() })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of weights
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow one column. Panics if `col >= cols`.
    #[inline]
    pub fn column(&self, col: usize) -> &[Real] {
        let start = col * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Snapshot a column into `out` (`out.len() == dim`).
    #[inline]
    pub fn load_column(&self, col: usize, out: &mut [f32]) {
        for (dst, src) in out.iter_mut().zip(self.column(col)) {
            *dst = src.get();
        }
    }

    /// Overwrite a column with `src` (`src.len() == dim`).
    pub fn store_column(&self, col: usize, src: &[f32]) {
        for (dst, &value) in self.column(col).iter().zip(src) {
            dst.set(value);
        }
    }

    /// `column += alpha * x`
    #[inline]
    pub fn axpy_column(&self, col: usize, alpha: f32, x: &[f32]) {
        for (y, &xi) in self.column(col).iter().zip(x) {
            y.add(alpha * xi);
        }
    }

    /// `column += x`
    #[inline]
    pub fn add_column(&self, col: usize, x: &[f32]) {
        for (y, &xi) in self.column(col).iter().zip(x) {
            y.add(xi);
        }
    }

    /// All weights in storage (column-major) order
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().map(Real::get)
    }

    /// Overwrite weights in storage order starting at flat offset `start`.
    pub fn store_flat(&self, start: usize, src: &[f32]) {
        for (dst, &value) in self.data[start..start + src.len()].iter().zip(src) {
            dst.set(value);
        }
    }
}
