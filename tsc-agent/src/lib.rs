#![warn(missing_docs)]
//! Value-based agents for traffic-signal control.
//!
//! * [`Dqn`]: deep Q-learning with experience replay and a target estimator.
//! * [`TabularQAgent`]: Q-learning over a discretized state space, updated directly
//!   from each transition.
//!
//! Both agents work on any [`ValueEstimator`]. [`MlpQ`] is a multilayer perceptron
//! built on candle, [`TabularQ`] an explicit table.
pub mod dqn;
mod estimator;
pub mod mlp;
pub mod tabular;
pub mod util;

pub use dqn::{Dqn, DqnConfig, EpsilonGreedy, EpsilonSchedule};
pub use estimator::{bootstrap_targets, TargetSync, UpdateParams, ValueEstimator};
pub use mlp::{MlpQ, MlpQConfig};
pub use tabular::{
    Discretizer, QueueDiscretizer, QueueDiscretizerConfig, TabularQ, TabularQAgent,
    TabularQAgentConfig,
};
