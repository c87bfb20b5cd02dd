//! Tabular Q-learning agent.
use super::{QueueDiscretizer, QueueDiscretizerConfig, TabularQ};
use crate::{EpsilonGreedy, UpdateParams, ValueEstimator};
use anyhow::Result;
use log::info;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::Path,
};
use tsc_core::{
    record::{Record, RecordValue},
    Act, Agent, Env, FeatureLayout, Obs, Policy, RunSeed, SeedStream, Transition, TscError,
};

/// Configuration of [`TabularQAgent`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TabularQAgentConfig {
    /// Discount factor γ.
    pub discount_factor: f32,

    /// Learning rate α.
    pub learning_rate: f32,

    /// Exploration.
    pub explorer: EpsilonGreedy,

    /// State discretization.
    pub discretizer: QueueDiscretizerConfig,

    /// Rewards are clipped to `[-reward_clip, reward_clip]`.
    pub reward_clip: f32,

    /// Targets are clipped to `[-target_clip, target_clip]`.
    pub target_clip: f32,
}

impl Default for TabularQAgentConfig {
    fn default() -> Self {
        Self {
            discount_factor: 0.95,
            learning_rate: 0.1,
            explorer: EpsilonGreedy::constant(0.1),
            discretizer: QueueDiscretizerConfig::default(),
            reward_clip: 100.0,
            target_clip: 1000.0,
        }
    }
}

impl TabularQAgentConfig {
    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f32) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, v: f32) -> Self {
        self.learning_rate = v;
        self
    }

    /// Sets the explorer.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Sets the discretizer.
    pub fn discretizer(mut self, v: QueueDiscretizerConfig) -> Self {
        self.discretizer = v;
        self
    }

    fn update_params(&self) -> UpdateParams {
        UpdateParams {
            discount_factor: self.discount_factor,
            reward_clip: self.reward_clip,
            target_clip: self.target_clip,
        }
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.discount_factor > 0.0 && self.discount_factor < 1.0) {
            return Err(TscError::InvalidConfig(format!(
                "discount factor must be in (0, 1), got {}",
                self.discount_factor
            ))
            .into());
        }
        if !(self.learning_rate >= 0.0 && self.learning_rate <= 1.0) {
            return Err(TscError::InvalidConfig(format!(
                "learning rate must be in [0, 1], got {}",
                self.learning_rate
            ))
            .into());
        }
        if !(self.reward_clip > 0.0 && self.target_clip > 0.0) {
            return Err(TscError::InvalidConfig("clipping bounds must be positive".to_string()).into());
        }
        self.explorer.validate()?;
        self.discretizer.validate()
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

/// Q-learning over discretized states.
///
/// Every observed transition updates the table directly; there is no replay buffer
/// and no target table.
pub struct TabularQAgent {
    config: TabularQAgentConfig,
    params: UpdateParams,
    q: TabularQ,
    train: bool,
    n_steps: usize,
    rng: StdRng,
}

impl TabularQAgent {
    /// Builds the agent for an environment with the given feature layout.
    pub fn build(config: &TabularQAgentConfig, layout: FeatureLayout, seed: RunSeed) -> Result<Self> {
        config.validate()?;
        let discretizer = QueueDiscretizer::build(&config.discretizer, layout)?;
        let q = TabularQ::new(discretizer, layout.n_actions(), config.learning_rate);
        info!(
            "Build tabular Q agent: {} states x {} actions",
            q.n_states(),
            q.n_actions()
        );
        Ok(Self {
            config: config.clone(),
            params: config.update_params(),
            q,
            train: true,
            n_steps: 0,
            rng: seed.rng(SeedStream::Exploration),
        })
    }

    /// The Q table.
    pub fn estimator(&self) -> &TabularQ {
        &self.q
    }
}

impl<E: Env> Policy<E> for TabularQAgent {
    fn act(&mut self, obs: &E::Obs) -> Result<E::Act> {
        let ix = if self.train && self.config.explorer.explore(self.n_steps, &mut self.rng) {
            self.rng.gen_range(0..self.q.n_actions())
        } else {
            self.q.predict_best(&obs.features())?.0
        };
        if self.train {
            self.n_steps += 1;
        }
        Ok(E::Act::from_index(ix))
    }

    fn observe(&mut self, transition: &Transition) -> Result<Option<Record>> {
        if !self.train {
            return Ok(None);
        }
        if !transition.is_finite() {
            return Err(TscError::NonFinite("transition with non-finite values".to_string()).into());
        }
        let sq_err = self.q.update_direct(transition, &self.params)?;
        Ok(Some(Record::from_slice(&[
            ("td_error_sq", RecordValue::Scalar(sq_err)),
            (
                "epsilon",
                RecordValue::Scalar(self.config.explorer.eps(self.n_steps) as f32),
            ),
        ])))
    }
}

impl<E: Env> Agent<E> for TabularQAgent {
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.q.save(&path.join("q_table.json"))
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.q.load(&path.join("q_table.json"))
    }
}
