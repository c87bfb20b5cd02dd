use anyhow::Result;
use serde::{Deserialize, Serialize};
use tsc_core::{Policy, TscError};
use tsc_env::{IntersectionEnv, IntersectionLayout, IntersectionObs, SignalAct, Simulator};

/// Configuration of [`FixedCycle`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FixedCycleConfig {
    /// Green duration of each phase, in steps.
    pub durations: Vec<usize>,
}

impl Default for FixedCycleConfig {
    fn default() -> Self {
        Self {
            durations: vec![15, 15],
        }
    }
}

impl FixedCycleConfig {
    /// Sets the durations.
    pub fn durations(mut self, v: Vec<usize>) -> Self {
        self.durations = v;
        self
    }

    /// Checks the durations against an intersection.
    pub fn validate(&self, layout: &IntersectionLayout) -> Result<()> {
        if self.durations.len() != layout.n_phases() || self.durations.iter().any(|&d| d == 0) {
            return Err(TscError::InvalidConfig(format!(
                "fixed cycle needs one positive duration per phase ({}), got {:?}",
                layout.n_phases(),
                self.durations
            ))
            .into());
        }
        Ok(())
    }
}

/// Round robin over the phases with fixed green durations.
///
/// The controller keeps a timer of the current phase. If the environment did not apply
/// a switch (or forced one), the timer follows the observed phase.
pub struct FixedCycle {
    durations: Vec<usize>,
    phase: usize,
    timer: usize,
}

impl FixedCycle {
    /// Builds the controller for an intersection.
    pub fn build(config: &FixedCycleConfig, layout: &IntersectionLayout) -> Result<Self> {
        config.validate(layout)?;
        Ok(Self {
            durations: config.durations.clone(),
            phase: 0,
            timer: 0,
        })
    }

    /// Action for an observation.
    pub fn decide(&mut self, obs: &IntersectionObs) -> SignalAct {
        if obs.phase != self.phase {
            self.phase = obs.phase;
            self.timer = obs.elapsed;
        }
        if self.timer >= self.durations[self.phase] {
            self.phase = (self.phase + 1) % self.durations.len();
            self.timer = 1;
            SignalAct::Activate(self.phase)
        } else {
            self.timer += 1;
            SignalAct::Extend
        }
    }
}

impl<S: Simulator> Policy<IntersectionEnv<S>> for FixedCycle {
    fn act(&mut self, obs: &IntersectionObs) -> Result<SignalAct> {
        Ok(self.decide(obs))
    }

    fn reset_episode(&mut self) {
        self.phase = 0;
        self.timer = 0;
    }
}
