//! CPU backend for wvec
//!
//! Provides the vector kernels, the lock-free skip-gram trainer and
//! similarity queries.

pub mod kernels;
pub mod query;
pub mod skipgram;

pub use query::{analogy, most_similar, Neighbor};
pub use skipgram::{train_corpus, train_pair, CorpusStats, CHUNK_SIZE};

use wvec_core::error::{Error, Result};

/// CPU backend configuration
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    /// Number of worker threads (0 = rayon default)
    pub num_threads: usize,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    /// Build a dedicated pool, or `None` to run on rayon's global pool.
    pub fn thread_pool(&self) -> Result<Option<rayon::ThreadPool>> {
        if self.num_threads == 0 {
            return Ok(None);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("wvec-worker-{}", i))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Some(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_global_pool() {
        assert!(CpuBackend::new().thread_pool().unwrap().is_none());
    }

    #[test]
    fn test_dedicated_pool_size() {
        let pool = CpuBackend::new().with_threads(3).thread_pool().unwrap().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
