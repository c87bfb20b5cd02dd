//! DQN agent.
use super::DqnConfig;
use crate::{MlpQ, TargetSync, UpdateParams, ValueEstimator};
use anyhow::Result;
use log::{debug, info};
use rand::{rngs::StdRng, Rng};
use std::{fs, path::Path};
use tsc_core::{
    record::{Record, RecordValue},
    replay_buffer::SimpleReplayBuffer,
    Act, Agent, Env, ExperienceBufferBase, FeatureLayout, Obs, Policy, ReplayBufferBase,
    RunSeed, SeedStream, Transition, TscError,
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Deep Q-learning agent.
///
/// The agent owns its replay buffer, the online and target estimators and its random
/// generators; nothing is shared with other agents.
///
/// ```mermaid
/// stateDiagram-v2
///   [*] --> Exploring: u < ε
///   [*] --> Exploiting: u ≥ ε
///   Exploring --> [*]: uniform random action
///   Exploiting --> [*]: predict_best(state)
/// ```
///
/// [`Policy::observe`] pushes the transition to the buffer. Once the buffer holds
/// `min_transitions_warmup` transitions, each call samples a batch and updates the
/// online estimator against the target estimator; every `sync_interval` updates the
/// target estimator is synchronised, after the update has completed.
///
/// In evaluation mode, actions are greedy and `observe` does nothing.
pub struct Dqn<Q: ValueEstimator = MlpQ> {
    qnet: Q,
    qnet_tgt: Q,
    buffer: SimpleReplayBuffer,
    config: DqnConfig,
    params: UpdateParams,
    train: bool,
    n_steps: usize,
    n_opts: usize,
    rng: StdRng,
}

impl Dqn<MlpQ> {
    /// Builds the agent with Q-networks for an environment with the given layout.
    pub fn build(config: &DqnConfig, layout: FeatureLayout, seed: RunSeed) -> Result<Self> {
        config.validate()?;
        let mut rng = seed.rng(SeedStream::Init);
        let qnet = MlpQ::build(&config.model, layout.dim(), layout.n_actions(), &mut rng)?;
        let qnet_tgt = MlpQ::build(&config.model, layout.dim(), layout.n_actions(), &mut rng)?;
        Self::from_estimators(config, qnet, qnet_tgt, seed)
    }
}

impl<Q: ValueEstimator> Dqn<Q> {
    /// Creates the agent from an online and a target estimator.
    ///
    /// The target estimator starts as a copy of the online estimator.
    pub fn from_estimators(
        config: &DqnConfig,
        qnet: Q,
        mut qnet_tgt: Q,
        seed: RunSeed,
    ) -> Result<Self> {
        config.validate()?;
        qnet_tgt.sync_from(&qnet, TargetSync::Hard)?;
        let buffer = SimpleReplayBuffer::build(
            &config
                .replay_buffer
                .clone()
                .seed(seed.derive(SeedStream::Replay)),
        );
        info!(
            "Build DQN agent: {} actions, batch size {}, sync every {} updates ({:?})",
            qnet.n_actions(),
            config.batch_size,
            config.sync_interval,
            config.target_sync
        );
        Ok(Self {
            qnet,
            qnet_tgt,
            buffer,
            config: config.clone(),
            params: config.update_params(),
            train: true,
            n_steps: 0,
            n_opts: 0,
            rng: seed.rng(SeedStream::Exploration),
        })
    }

    /// The online estimator.
    pub fn estimator(&self) -> &Q {
        &self.qnet
    }

    /// The target estimator.
    pub fn target_estimator(&self) -> &Q {
        &self.qnet_tgt
    }

    /// Number of transitions in the replay buffer.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of updates performed so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Current exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.config.explorer.eps(self.n_steps)
    }

    fn select(&mut self, features: &[f32]) -> Result<usize> {
        if self.train && self.config.explorer.explore(self.n_steps, &mut self.rng) {
            Ok(self.rng.gen_range(0..self.qnet.n_actions()))
        } else {
            Ok(self.qnet.predict_best(features)?.0)
        }
    }

    fn opt(&mut self) -> Result<Record> {
        let batch = self.buffer.batch(self.config.batch_size)?;
        let loss = self.qnet.update(&batch, &self.qnet_tgt, &self.params)?;
        self.n_opts += 1;

        let mut record = Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("n_opts", RecordValue::Scalar(self.n_opts as f32)),
        ]);
        if self.n_opts % self.config.sync_interval == 0 {
            self.qnet_tgt.sync_from(&self.qnet, self.config.target_sync)?;
            debug!("Target synchronised after {} updates", self.n_opts);
            record.insert("target_sync", RecordValue::Scalar(1.0));
        }
        Ok(record)
    }
}

impl<E: Env, Q: ValueEstimator> Policy<E> for Dqn<Q> {
    fn act(&mut self, obs: &E::Obs) -> Result<E::Act> {
        let ix = self.select(&obs.features())?;
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
        self.buffer.push(transition.clone())?;

        // An underfilled buffer is not an error: skip the update.
        if self.buffer.len() < self.config.min_transitions_warmup {
            return Ok(None);
        }
        let mut record = self.opt()?;
        record.insert("epsilon", RecordValue::Scalar(self.epsilon() as f32));
        Ok(Some(record))
    }
}

impl<E: Env, Q: ValueEstimator> Agent<E> for Dqn<Q> {
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
        self.qnet.save(&path.join("qnet"))?;
        self.qnet_tgt.save(&path.join("qnet_tgt"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(&path.join("qnet"))?;
        self.qnet_tgt.load(&path.join("qnet_tgt"))?;
        Ok(())
    }
}
