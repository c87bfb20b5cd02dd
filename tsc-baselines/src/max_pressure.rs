use anyhow::Result;
use log::trace;
use serde::{Deserialize, Serialize};
use tsc_core::Policy;
use tsc_env::{IntersectionEnv, IntersectionLayout, IntersectionObs, Movement, SignalAct, Simulator};

/// How the pressure of a phase is computed.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum PressureMode {
    /// Queues of the incoming approaches minus queues of the outgoing links served by
    /// the phase, each approach and link counted once.
    #[default]
    PerApproach,

    /// Sum over the movements of the phase of `in[from] - out[to]`.
    PerMovement,
}

/// Configuration of [`MaxPressure`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct MaxPressureConfig {
    /// Pressure computation.
    pub mode: PressureMode,
}

impl MaxPressureConfig {
    /// Sets the pressure mode.
    pub fn mode(mut self, v: PressureMode) -> Self {
        self.mode = v;
        self
    }
}

enum Terms {
    Approach { approaches: Vec<usize>, links: Vec<usize> },
    Movement(Vec<Movement>),
}

/// Activates the phase with the largest pressure at every step.
///
/// Equal pressures go to the phase with the lowest index.
pub struct MaxPressure {
    phases: Vec<Terms>,
}

impl MaxPressure {
    /// Builds the controller for an intersection.
    pub fn build(config: &MaxPressureConfig, layout: &IntersectionLayout) -> Result<Self> {
        layout.validate()?;
        let phases = layout
            .phases
            .iter()
            .map(|p| match config.mode {
                PressureMode::PerApproach => Terms::Approach {
                    approaches: p.approaches(),
                    links: p.links(),
                },
                PressureMode::PerMovement => Terms::Movement(p.movements.clone()),
            })
            .collect();
        Ok(Self { phases })
    }

    /// Pressure of each phase.
    pub fn pressures(&self, obs: &IntersectionObs) -> Vec<f32> {
        self.phases
            .iter()
            .map(|terms| match terms {
                Terms::Approach { approaches, links } => {
                    approaches.iter().map(|&a| obs.queues[a]).sum::<f32>()
                        - links.iter().map(|&l| obs.outgoing[l]).sum::<f32>()
                }
                Terms::Movement(movements) => movements
                    .iter()
                    .map(|m| obs.queues[m.from] - obs.outgoing[m.to])
                    .sum(),
            })
            .collect()
    }

    /// Action for an observation.
    pub fn decide(&self, obs: &IntersectionObs) -> SignalAct {
        let pressures = self.pressures(obs);
        let mut best = 0;
        for (p, &v) in pressures.iter().enumerate().skip(1) {
            if v > pressures[best] {
                best = p;
            }
        }
        trace!("Pressures {:?}, activate phase {}", pressures, best);
        SignalAct::Activate(best)
    }
}

impl<S: Simulator> Policy<IntersectionEnv<S>> for MaxPressure {
    fn act(&mut self, obs: &IntersectionObs) -> Result<SignalAct> {
        Ok(self.decide(obs))
    }
}
