//! Environment adapter.
use crate::{IntersectionLayout, IntersectionObs, SignalAct, SimSnapshot, Simulator, SimulatorError};
use anyhow::Result;
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tsc_core::{
    record::{Record, RecordValue},
    Env, FeatureLayout, Info, Step, StepMetrics, TscError,
};

/// Weights of the reward terms.
///
/// The reward of a step is
/// `-queue * Σ queues(s') - waiting * Σ waiting(s') + throughput * departed(s -> s')`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct RewardWeights {
    /// Weight of the total queue length.
    pub queue: f32,

    /// Weight of the accumulated waiting time.
    pub waiting: f32,

    /// Weight of the number of departed vehicles.
    pub throughput: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            queue: 1.0,
            waiting: 0.05,
            throughput: 0.5,
        }
    }
}

impl RewardWeights {
    /// Reward of the transition into `next`.
    pub fn reward(&self, next: &SimSnapshot) -> f32 {
        let queue: f32 = next.queues.iter().sum();
        let waiting: f32 = next.waiting.iter().sum();
        -self.queue * queue - self.waiting * waiting + self.throughput * next.departed
    }
}

/// Configuration of [`IntersectionEnv`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IntersectionEnvConfig<C> {
    /// Configuration of the simulator.
    pub simulator: C,

    /// Minimum number of steps a phase stays green before it may be switched.
    pub min_green: usize,

    /// Maximum number of steps a phase stays green.
    pub max_green: usize,

    /// Step budget of an episode.
    pub max_steps: usize,

    /// Reward weights.
    pub reward: RewardWeights,
}

impl<C: Default> Default for IntersectionEnvConfig<C> {
    fn default() -> Self {
        Self {
            simulator: C::default(),
            min_green: 3,
            max_green: 30,
            max_steps: 60,
            reward: RewardWeights::default(),
        }
    }
}

impl<C> IntersectionEnvConfig<C> {
    /// Sets the simulator configuration.
    pub fn simulator(mut self, v: C) -> Self {
        self.simulator = v;
        self
    }

    /// Sets the minimum green duration.
    pub fn min_green(mut self, v: usize) -> Self {
        self.min_green = v;
        self
    }

    /// Sets the maximum green duration.
    pub fn max_green(mut self, v: usize) -> Self {
        self.max_green = v;
        self
    }

    /// Sets the step budget.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the reward weights.
    pub fn reward(mut self, v: RewardWeights) -> Self {
        self.reward = v;
        self
    }

    /// Checks the phase-duration policy and the step budget.
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(TscError::InvalidConfig("max_steps must be positive".to_string()).into());
        }
        if self.max_green == 0 || self.min_green > self.max_green {
            return Err(TscError::InvalidConfig(format!(
                "invalid green durations: min_green = {}, max_green = {}",
                self.min_green, self.max_green
            ))
            .into());
        }
        Ok(())
    }
}

impl<C> IntersectionEnvConfig<C>
where
    C: Serialize + DeserializeOwned,
{
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

/// What happened to the requested action in a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInfo {
    /// A switch before the minimum green was replaced by [`SignalAct::Extend`].
    pub substituted: bool,

    /// The phase was switched because it reached the maximum green.
    pub forced: bool,

    /// The simulator faulted twice and the episode was truncated.
    pub fault: bool,

    /// Simulation clock after the step.
    pub time: usize,
}

impl Info for StepInfo {}

/// Adapts a [`Simulator`] to the [`Env`] contract.
///
/// * Actions that switch the phase before `min_green` steps are replaced by
///   [`SignalAct::Extend`]; keeping a phase beyond `max_green` steps is replaced by
///   activating the next phase. Both are deterministic functions of the phase clock.
/// * A simulator fault is retried once. If the retry also faults, the step returns the
///   last valid observation and reward with `is_truncated = true`.
/// * A snapshot that does not match the layout, or carries negative or non-finite
///   values, fails the step with [`TscError::MalformedState`].
/// * The episode terminates after `max_steps` steps.
pub struct IntersectionEnv<S: Simulator> {
    config: IntersectionEnvConfig<S::Config>,
    sim: S,
    phase: usize,
    elapsed: usize,
    t: usize,
    last_obs: Option<IntersectionObs>,
    last_reward: f32,
    last_metrics: StepMetrics,
}

impl<S: Simulator> IntersectionEnv<S> {
    /// Geometry of the intersection.
    pub fn intersection(&self) -> &IntersectionLayout {
        self.sim.layout()
    }

    /// Current phase.
    pub fn phase(&self) -> usize {
        self.phase
    }

    fn n_phases(&self) -> usize {
        self.sim.layout().n_phases()
    }

    /// Applies the phase-duration policy to the requested action.
    fn resolve(&self, a: &SignalAct) -> Result<(SignalAct, StepInfo)> {
        let mut info = StepInfo::default();
        let wants_switch = match *a {
            SignalAct::Extend => false,
            SignalAct::Activate(p) if p >= self.n_phases() => {
                return Err(TscError::InvalidAction(format!(
                    "activation of unknown phase {}",
                    p
                ))
                .into());
            }
            SignalAct::Activate(p) => p != self.phase,
        };

        let act = if wants_switch && self.elapsed < self.config.min_green {
            info.substituted = true;
            SignalAct::Extend
        } else if !wants_switch && self.elapsed >= self.config.max_green && self.n_phases() > 1 {
            info.forced = true;
            SignalAct::Activate((self.phase + 1) % self.n_phases())
        } else if wants_switch {
            *a
        } else {
            SignalAct::Extend
        };
        Ok((act, info))
    }

    fn observe(&self, s: &SimSnapshot, phase: usize, elapsed: usize) -> Result<IntersectionObs> {
        let layout = self.sim.layout();
        let malformed = |msg: String| -> Result<IntersectionObs> {
            Err(TscError::MalformedState(msg).into())
        };
        if s.queues.len() != layout.n_approaches()
            || s.waiting.len() != layout.n_approaches()
            || s.occupancy.len() != layout.n_approaches()
            || s.outgoing.len() != layout.n_links()
        {
            return malformed(format!(
                "snapshot sizes do not match the intersection at t = {}",
                s.time
            ));
        }
        let mut values = s
            .queues
            .iter()
            .chain(s.waiting.iter())
            .chain(s.outgoing.iter())
            .chain(s.occupancy.iter())
            .chain(std::iter::once(&s.departed));
        if values.any(|v| !v.is_finite() || *v < 0.0) {
            return malformed(format!("negative or non-finite value at t = {}", s.time));
        }
        if s.occupancy.iter().any(|&o| o > 1.0) {
            return malformed(format!("occupancy above 1 at t = {}", s.time));
        }
        Ok(IntersectionObs {
            queues: s.queues.clone(),
            waiting: s.waiting.clone(),
            outgoing: s.outgoing.clone(),
            occupancy: s.occupancy.clone(),
            phase,
            elapsed,
            n_phases: layout.n_phases(),
        })
    }

    /// Steps the simulator, retrying once on a fault.
    fn sim_step(&mut self, phase: usize) -> Result<Option<SimSnapshot>> {
        for attempt in 0..2 {
            match self.sim.step(phase) {
                Ok(s) => return Ok(Some(s)),
                Err(SimulatorError::Fault(msg)) => {
                    warn!("Simulator fault at t = {} (attempt {}): {}", self.t, attempt + 1, msg);
                }
                Err(SimulatorError::Unavailable(msg)) => {
                    return Err(TscError::SimulatorUnavailable(msg).into());
                }
            }
        }
        Ok(None)
    }

    fn truncated_step(&self, info: StepInfo) -> Result<(Step<Self>, Record)> {
        let obs = self
            .last_obs
            .clone()
            .ok_or_else(|| TscError::SimulatorFault("fault before reset".to_string()))?;
        let info = StepInfo {
            fault: true,
            time: self.t,
            ..info
        };
        let record = Record::from_slice(&[(
            "fault",
            RecordValue::String(format!("simulator faulted twice at t = {}", self.t)),
        )]);
        let step = Step::new(
            obs,
            SignalAct::Extend,
            self.last_reward,
            false,
            true,
            self.last_metrics,
            info,
        );
        Ok((step, record))
    }
}

impl<S: Simulator> Env for IntersectionEnv<S> {
    type Config = IntersectionEnvConfig<S::Config>;
    type Obs = IntersectionObs;
    type Act = SignalAct;
    type Info = StepInfo;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let sim = S::build(&config.simulator)
            .map_err(|e| TscError::SimulatorUnavailable(e.to_string()))?;
        info!(
            "Build intersection environment: {} approaches, {} phases",
            sim.layout().n_approaches(),
            sim.layout().n_phases()
        );
        Ok(Self {
            config: config.clone(),
            sim,
            phase: 0,
            elapsed: 0,
            t: 0,
            last_obs: None,
            last_reward: 0.0,
            last_metrics: StepMetrics::default(),
        })
    }

    fn reset(&mut self, seed: u64) -> Result<IntersectionObs> {
        let s = self
            .sim
            .reset(seed)
            .map_err(|e| TscError::SimulatorUnavailable(e.to_string()))?;
        self.phase = 0;
        self.elapsed = 0;
        self.t = 0;
        self.last_reward = 0.0;
        self.last_metrics = StepMetrics::default();
        let obs = self.observe(&s, 0, 0)?;
        self.last_obs = Some(obs.clone());
        Ok(obs)
    }

    fn step(&mut self, a: &SignalAct) -> Result<(Step<Self>, Record)> {
        let (act, mut info) = self.resolve(a)?;
        let (phase, elapsed) = match act {
            SignalAct::Activate(p) => (p, 1),
            SignalAct::Extend => (self.phase, self.elapsed + 1),
        };

        let s = match self.sim_step(phase)? {
            Some(s) => s,
            None => return self.truncated_step(info),
        };
        let obs = self.observe(&s, phase, elapsed)?;

        self.phase = phase;
        self.elapsed = elapsed;
        self.t += 1;
        info.time = self.t;

        let reward = self.config.reward.reward(&s);
        let total_queue = obs.total_queue();
        let metrics = StepMetrics {
            total_queue,
            mean_waiting: if total_queue > 0.0 {
                obs.waiting.iter().sum::<f32>() / total_queue
            } else {
                0.0
            },
            departed: s.departed,
        };
        self.last_obs = Some(obs.clone());
        self.last_reward = reward;
        self.last_metrics = metrics;

        let mut record = Record::empty();
        if info.substituted {
            debug!("t = {}: switch to {:?} before min green, extended", self.t, a);
            record.insert("substituted", RecordValue::Scalar(1.0));
        }
        if info.forced {
            debug!("t = {}: max green reached, activated phase {}", self.t, phase);
            record.insert("forced", RecordValue::Scalar(1.0));
        }

        let is_terminated = self.t >= self.config.max_steps;
        let step = Step::new(obs, act, reward, is_terminated, false, metrics, info);
        Ok((step, record))
    }

    fn n_actions(&self) -> usize {
        self.n_phases() + 1
    }

    fn layout(&self) -> FeatureLayout {
        self.sim.layout().feature_layout()
    }
}
