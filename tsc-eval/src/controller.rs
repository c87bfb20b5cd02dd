//! Controllers built from a [`ControllerConfig`].
use crate::ControllerConfig;
use anyhow::Result;
use tsc_agent::{Dqn, MlpQ, TabularQAgent};
use tsc_baselines::{Actuated, FixedCycle, MaxPressure};
use tsc_core::{record::Record, Agent, Env, Policy, RunSeed, Transition};
use tsc_env::{IntersectionEnv, IntersectionLayout, IntersectionObs, SignalAct, Simulator};

/// Any controller of the evaluation, driven by the episode runner through
/// [`Policy`].
pub enum Controller {
    /// DQN agent.
    Dqn(Box<Dqn>),

    /// Tabular Q-learning agent.
    TabularQ(Box<TabularQAgent>),

    /// Fixed-cycle controller.
    FixedCycle(FixedCycle),

    /// Actuated controller.
    Actuated(Actuated),

    /// Max-pressure controller.
    MaxPressure(MaxPressure),
}

impl Controller {
    /// Builds a controller. Learned controllers draw their randomness from `seed`.
    pub fn build(config: &ControllerConfig, layout: &IntersectionLayout, seed: RunSeed) -> Result<Self> {
        let features = layout.feature_layout();
        Ok(match config {
            ControllerConfig::Dqn(c) => Self::Dqn(Box::new(Dqn::<MlpQ>::build(c, features, seed)?)),
            ControllerConfig::TabularQ(c) => {
                Self::TabularQ(Box::new(TabularQAgent::build(c, features, seed)?))
            }
            ControllerConfig::FixedCycle(c) => Self::FixedCycle(FixedCycle::build(c, layout)?),
            ControllerConfig::Actuated(c) => Self::Actuated(Actuated::build(c, layout)?),
            ControllerConfig::MaxPressure(c) => Self::MaxPressure(MaxPressure::build(c, layout)?),
        })
    }

    /// Returns `true` for learned controllers.
    pub fn is_learned(&self) -> bool {
        matches!(self, Self::Dqn(_) | Self::TabularQ(_))
    }

    /// Switches a learned controller between training and evaluation mode.
    ///
    /// Rule-based controllers are unaffected.
    pub fn set_train<S: Simulator>(&mut self, train: bool) {
        match self {
            Self::Dqn(a) => set_mode::<IntersectionEnv<S>, _>(a.as_mut(), train),
            Self::TabularQ(a) => set_mode::<IntersectionEnv<S>, _>(a.as_mut(), train),
            _ => {}
        }
    }
}

fn set_mode<E: Env, A: Agent<E>>(agent: &mut A, train: bool) {
    if train {
        agent.train();
    } else {
        agent.eval();
    }
}

impl<S: Simulator> Policy<IntersectionEnv<S>> for Controller {
    fn act(&mut self, obs: &IntersectionObs) -> Result<SignalAct> {
        match self {
            Self::Dqn(a) => Policy::<IntersectionEnv<S>>::act(a.as_mut(), obs),
            Self::TabularQ(a) => Policy::<IntersectionEnv<S>>::act(a.as_mut(), obs),
            Self::FixedCycle(c) => Policy::<IntersectionEnv<S>>::act(c, obs),
            Self::Actuated(c) => Policy::<IntersectionEnv<S>>::act(c, obs),
            Self::MaxPressure(c) => Policy::<IntersectionEnv<S>>::act(c, obs),
        }
    }

    fn observe(&mut self, transition: &Transition) -> Result<Option<Record>> {
        match self {
            Self::Dqn(a) => Policy::<IntersectionEnv<S>>::observe(a.as_mut(), transition),
            Self::TabularQ(a) => Policy::<IntersectionEnv<S>>::observe(a.as_mut(), transition),
            _ => Ok(None),
        }
    }

    fn reset_episode(&mut self) {
        match self {
            Self::Dqn(a) => Policy::<IntersectionEnv<S>>::reset_episode(a.as_mut()),
            Self::TabularQ(a) => Policy::<IntersectionEnv<S>>::reset_episode(a.as_mut()),
            Self::FixedCycle(c) => Policy::<IntersectionEnv<S>>::reset_episode(c),
            Self::Actuated(c) => Policy::<IntersectionEnv<S>>::reset_episode(c),
            Self::MaxPressure(c) => Policy::<IntersectionEnv<S>>::reset_episode(c),
        }
    }
}
