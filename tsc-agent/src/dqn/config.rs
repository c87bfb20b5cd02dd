//! Configuration of the DQN agent.
use super::EpsilonGreedy;
use crate::{MlpQConfig, TargetSync, UpdateParams};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tsc_core::{replay_buffer::SimpleReplayBufferConfig, TscError};

/// Configuration of [`Dqn`](super::Dqn).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig {
    /// Q-network.
    pub model: MlpQConfig,

    /// Replay buffer. Its seed is replaced by the replay stream of the run seed.
    pub replay_buffer: SimpleReplayBufferConfig,

    /// Exploration.
    pub explorer: EpsilonGreedy,

    /// Discount factor γ.
    pub discount_factor: f32,

    /// Number of transitions per update.
    pub batch_size: usize,

    /// Updates start once the buffer holds this many transitions.
    pub min_transitions_warmup: usize,

    /// Number of updates between two target synchronisations.
    pub sync_interval: usize,

    /// Hard or soft synchronisation.
    pub target_sync: TargetSync,

    /// Rewards are clipped to `[-reward_clip, reward_clip]`.
    pub reward_clip: f32,

    /// Targets are clipped to `[-target_clip, target_clip]`.
    pub target_clip: f32,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            model: MlpQConfig::default(),
            replay_buffer: SimpleReplayBufferConfig::default(),
            explorer: EpsilonGreedy::default(),
            discount_factor: 0.95,
            batch_size: 32,
            min_transitions_warmup: 100,
            sync_interval: 100,
            target_sync: TargetSync::Hard,
            reward_clip: 100.0,
            target_clip: 1000.0,
        }
    }
}

impl DqnConfig {
    /// Sets the Q-network configuration.
    pub fn model(mut self, v: MlpQConfig) -> Self {
        self.model = v;
        self
    }

    /// Sets the replay buffer capacity.
    pub fn replay_capacity(mut self, v: usize) -> Self {
        self.replay_buffer.capacity = v;
        self
    }

    /// Sets the explorer.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f32) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the warm-up size.
    pub fn min_transitions_warmup(mut self, v: usize) -> Self {
        self.min_transitions_warmup = v;
        self
    }

    /// Sets the synchronisation cadence.
    pub fn sync_interval(mut self, v: usize) -> Self {
        self.sync_interval = v;
        self
    }

    /// Sets the synchronisation mode.
    pub fn target_sync(mut self, v: TargetSync) -> Self {
        self.target_sync = v;
        self
    }

    /// Constants of the bootstrapped update.
    pub fn update_params(&self) -> UpdateParams {
        UpdateParams {
            discount_factor: self.discount_factor,
            reward_clip: self.reward_clip,
            target_clip: self.target_clip,
        }
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(TscError::InvalidConfig(msg).into()) };
        if !(self.discount_factor > 0.0 && self.discount_factor < 1.0) {
            return invalid(format!(
                "discount factor must be in (0, 1), got {}",
                self.discount_factor
            ));
        }
        self.replay_buffer.validate()?;
        if self.batch_size == 0 || self.batch_size > self.replay_buffer.capacity {
            return invalid(format!(
                "batch size {} must be in [1, {}]",
                self.batch_size, self.replay_buffer.capacity
            ));
        }
        if self.min_transitions_warmup < self.batch_size {
            return invalid(format!(
                "warm-up size {} is smaller than the batch size {}",
                self.min_transitions_warmup, self.batch_size
            ));
        }
        if self.sync_interval == 0 {
            return invalid("sync_interval must be positive".to_string());
        }
        if let TargetSync::Soft { tau } = self.target_sync {
            if !(tau > 0.0 && tau <= 1.0) {
                return invalid(format!("tau must be in (0, 1], got {}", tau));
            }
        }
        if !(self.reward_clip > 0.0 && self.target_clip > 0.0) {
            return invalid("clipping bounds must be positive".to_string());
        }
        self.explorer.validate()?;
        self.model.validate()
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
