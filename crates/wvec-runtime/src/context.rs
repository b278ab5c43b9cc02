use serde::{Deserialize, Serialize};
use std::path::Path;
use wvec_core::error::{Error, Result};
use wvec_core::formats::checkpoint;
use wvec_core::{InitConfig, ModelState, OutputInit};
use wvec_cpu::{CorpusStats, CpuBackend};

/// Runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Training threads (0 = rayon default)
    pub num_threads: usize,
    /// Initial contents of the output matrix
    pub output_init: OutputInit,
    /// Weight seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid config JSON: {}", e)))
    }

    pub fn init_config(&self) -> InitConfig {
        InitConfig { output_init: self.output_init, seed: self.seed }
    }
}

/// Model slot plus the pool training runs on
#[derive(Default)]
pub struct RuntimeContext {
    config: RuntimeConfig,
    state: ModelState,
    pool: Option<rayon::ThreadPool>,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let pool = CpuBackend::new().with_threads(config.num_threads).thread_pool()?;
        Ok(Self { config, state: ModelState::new(), pool })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Swap in a new configuration. The live model is kept.
    pub fn reconfigure(&mut self, config: RuntimeConfig) -> Result<()> {
        if config.num_threads != self.config.num_threads {
            self.pool = CpuBackend::new().with_threads(config.num_threads).thread_pool()?;
        }
        log::info!("Runtime configured: {:?}", config);
        self.config = config;
        Ok(())
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ModelState {
        &mut self.state
    }

    pub fn init_model(&mut self, vocab_size: i32, dim: i32) -> Result<()> {
        let init = self.config.init_config();
        self.state.init(vocab_size, dim, &init)
    }

    pub fn free_model(&mut self) {
        self.state.free();
    }

    pub fn train_pair(
        &self,
        center_id: i32,
        context_id: i32,
        neg_ids: &[i32],
        learning_rate: f32,
    ) -> Result<()> {
        wvec_cpu::train_pair(&self.state, center_id, context_id, neg_ids, learning_rate)
    }

    /// Run `train_corpus` on this context's pool.
    pub fn train_corpus(
        &self,
        token_ids: &[i32],
        window: i32,
        n_neg: i32,
        neg_table: &[i32],
        table_size: i32,
        learning_rate: f32,
    ) -> Result<CorpusStats> {
        let run = || {
            wvec_cpu::train_corpus(
                &self.state,
                token_ids,
                window,
                n_neg,
                neg_table,
                table_size,
                learning_rate,
            )
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    pub fn save_checkpoint<P: AsRef<Path>>(
        &self,
        path: P,
        epoch: i32,
        learning_rate: f32,
    ) -> Result<()> {
        checkpoint::save(path, &self.state, epoch, learning_rate)
    }

    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<(i32, f32)> {
        checkpoint::load(path, &mut self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.output_init, OutputInit::Zeros);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_config_fields() {
        let json = r#"{"num_threads": 2, "output_init": "uniform", "seed": 17}"#;
        let config = RuntimeConfig::from_json(json).unwrap();
        assert_eq!(config.num_threads, 2);
        assert_eq!(config.output_init, OutputInit::Uniform);
        assert_eq!(config.seed, Some(17));
    }

    #[test]
    fn test_config_rejects_garbage() {
        assert!(matches!(RuntimeConfig::from_json("{"), Err(Error::Config(_))));
        assert!(matches!(
            RuntimeConfig::from_json(r#"{"output_init": "gaussian"}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_reconfigure_keeps_model() {
        let mut ctx = RuntimeContext::default();
        ctx.init_model(6, 3).unwrap();
        ctx.reconfigure(RuntimeConfig { num_threads: 2, ..Default::default() }).unwrap();
        assert_eq!(ctx.state().dims(), (6, 3));
        assert_eq!(ctx.config().num_threads, 2);
    }

    #[test]
    fn test_train_on_dedicated_pool() {
        let config = RuntimeConfig { num_threads: 2, seed: Some(4), ..Default::default() };
        let mut ctx = RuntimeContext::new(config).unwrap();
        ctx.init_model(8, 4).unwrap();

        let tokens = [0, 1, 2, 3, 4, 5, 6, 7];
        let stats = ctx.train_corpus(&tokens, 1, 2, &[1, 3, 5], 3, 0.05).unwrap();
        assert_eq!(stats.pairs, 14);
    }
}
