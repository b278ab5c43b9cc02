//! Epoch-level training session
//!
//! The loop a driver runs around `train_corpus`: linear learning-rate decay,
//! a checkpoint after every completed epoch, and between epochs a look at
//! the shutdown flag and the thermal governor. Nothing here interrupts an
//! epoch that has already started.

use crate::context::RuntimeContext;
use crate::{shutdown, thermal};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use wvec_core::error::{Error, Result};

/// Thermal throttling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub sensor_path: PathBuf,
    pub threshold_celsius: i32,
    /// Sleep between sensor polls while overheating
    pub cooldown_ms: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            sensor_path: PathBuf::from(thermal::DEFAULT_SENSOR_PATH),
            threshold_celsius: 85,
            cooldown_ms: 5_000,
        }
    }
}

/// Session hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub epochs: i32,
    pub window: i32,
    pub negatives: i32,
    pub learning_rate: f32,
    pub min_learning_rate: f32,
    /// Saved after every epoch; also where `resume` looks.
    pub checkpoint_path: Option<PathBuf>,
    pub thermal: Option<ThermalConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            window: 5,
            negatives: 5,
            learning_rate: 0.025,
            min_learning_rate: 0.025 * 1e-4,
            checkpoint_path: None,
            thermal: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid session JSON: {}", e)))
    }
}

/// Outcome of `TrainingSession::run`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReport {
    /// Epoch the run started from (non-zero after `resume`)
    pub start_epoch: i32,
    /// Total completed epochs, counting those before `start_epoch`
    pub epochs_completed: i32,
    /// Rate the next epoch would use
    pub next_learning_rate: f32,
    pub pairs: u64,
    pub interrupted: bool,
}

/// Drives `train_corpus` across epochs
pub struct TrainingSession {
    config: SessionConfig,
    start_epoch: i32,
    /// Rate stored in the checkpoint `resume` loaded
    resumed_rate: Option<f32>,
}

impl TrainingSession {
    pub fn new(config: SessionConfig) -> Self {
        Self { config, start_epoch: 0, resumed_rate: None }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn start_epoch(&self) -> i32 {
        self.start_epoch
    }

    /// Load `checkpoint_path` into `ctx` if it exists and continue from its
    /// epoch and learning rate.
    ///
    /// Returns whether a checkpoint was loaded.
    pub fn resume(&mut self, ctx: &mut RuntimeContext) -> Result<bool> {
        let Some(path) = self.config.checkpoint_path.as_ref().filter(|p| p.exists()) else {
            return Ok(false);
        };

        let (epoch, lr) = ctx.load_checkpoint(path)?;
        log::info!("Resuming at epoch {} (saved lr={})", epoch, lr);
        self.start_epoch = epoch.max(0);
        self.resumed_rate = Some(lr);
        Ok(true)
    }

    /// Linear decay to zero at `epochs`, floored at `min_learning_rate`.
    ///
    /// A fresh session decays from `learning_rate` at epoch 0. After `resume`
    /// the decay starts from the checkpoint's rate at `start_epoch`.
    pub fn learning_rate_for(&self, epoch: i32) -> f32 {
        let (origin, rate) = match self.resumed_rate {
            Some(lr) if epoch >= self.start_epoch => (self.start_epoch, lr),
            _ => (0, self.config.learning_rate),
        };
        let span = (self.config.epochs - origin).max(1) as f32;
        let remaining = 1.0 - (epoch - origin) as f32 / span;
        (rate * remaining).max(self.config.min_learning_rate)
    }

    /// Block while the sensor reads hot. Returns `false` if shutdown was requested meanwhile.
    fn wait_until_cool(&self, limits: &ThermalConfig) -> Result<bool> {
        loop {
            if !thermal::check(&limits.sensor_path, limits.threshold_celsius)? {
                return Ok(true);
            }
            if shutdown::check() {
                return Ok(false);
            }
            log::warn!(
                "Sensor {} at or above {}°C, pausing {} ms",
                limits.sensor_path.display(),
                limits.threshold_celsius,
                limits.cooldown_ms
            );
            thread::sleep(Duration::from_millis(limits.cooldown_ms));
        }
    }

    /// Train from `start_epoch` up to `epochs`.
    ///
    /// Clears the shutdown flag first. The negative table is used whole.
    pub fn run(
        &self,
        ctx: &RuntimeContext,
        token_ids: &[i32],
        neg_table: &[i32],
    ) -> Result<SessionReport> {
        let table_size = i32::try_from(neg_table.len()).map_err(|_| {
            Error::InvalidSize(format!("negative table of {} entries", neg_table.len()))
        })?;
        ctx.state().model()?;

        shutdown::reset();

        let epochs = self.config.epochs;
        let mut epoch = self.start_epoch;
        let mut pairs = 0u64;
        let mut interrupted = false;

        while epoch < epochs {
            if shutdown::check() {
                interrupted = true;
                break;
            }
            if let Some(limits) = &self.config.thermal {
                if !self.wait_until_cool(limits)? {
                    interrupted = true;
                    break;
                }
            }

            let lr = self.learning_rate_for(epoch);
            let stats = ctx.train_corpus(
                token_ids,
                self.config.window,
                self.config.negatives,
                neg_table,
                table_size,
                lr,
            )?;
            pairs += stats.pairs;
            epoch += 1;
            log::info!("Epoch {}/{}: {} pairs, lr={}", epoch, epochs, stats.pairs, lr);

            if let Some(path) = &self.config.checkpoint_path {
                ctx.save_checkpoint(path, epoch, self.learning_rate_for(epoch))?;
            }
        }

        if interrupted {
            log::info!("Shutdown requested, stopping after epoch {}", epoch);
        }

        Ok(SessionReport {
            start_epoch: self.start_epoch,
            epochs_completed: epoch,
            next_learning_rate: self.learning_rate_for(epoch),
            pairs,
            interrupted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_decay() {
        let session = TrainingSession::new(SessionConfig {
            epochs: 4,
            learning_rate: 0.1,
            min_learning_rate: 0.001,
            ..Default::default()
        });
        assert_eq!(session.learning_rate_for(0), 0.1);
        assert!((session.learning_rate_for(2) - 0.05).abs() < 1e-7);
        assert_eq!(session.learning_rate_for(4), 0.001);
        assert_eq!(session.learning_rate_for(9), 0.001);
    }

    #[test]
    fn test_resumed_rate_anchors_decay() {
        let mut session = TrainingSession::new(SessionConfig {
            epochs: 4,
            learning_rate: 0.1,
            min_learning_rate: 0.001,
            ..Default::default()
        });
        session.start_epoch = 2;
        session.resumed_rate = Some(0.08);

        assert_eq!(session.learning_rate_for(2), 0.08);
        assert!((session.learning_rate_for(3) - 0.04).abs() < 1e-7);
        assert_eq!(session.learning_rate_for(4), 0.001);
        assert_eq!(session.learning_rate_for(0), 0.1);
    }

    #[test]
    fn test_session_config_json() {
        let json = r#"{
            "epochs": 2,
            "checkpoint_path": "/tmp/model.wvck",
            "thermal": {"threshold_celsius": 70}
        }"#;
        let config = SessionConfig::from_json(json).unwrap();
        assert_eq!(config.epochs, 2);
        assert_eq!(config.window, 5);
        assert_eq!(config.checkpoint_path, Some(PathBuf::from("/tmp/model.wvck")));

        let sensor = config.thermal.unwrap();
        assert_eq!(sensor.threshold_celsius, 70);
        assert_eq!(sensor.sensor_path, PathBuf::from(thermal::DEFAULT_SENSOR_PATH));
    }

    #[test]
    fn test_run_requires_model() {
        let _guard = crate::TEST_LOCK.lock();
        let session = TrainingSession::new(SessionConfig::default());
        let result = session.run(&RuntimeContext::default(), &[0, 1], &[0]);
        assert!(matches!(result, Err(Error::NotInitialized)));
    }
}
