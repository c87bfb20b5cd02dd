#![warn(missing_docs)]
//! Signalized intersection environment.
//!
//! [`IntersectionEnv`] is the only component that talks to a traffic simulator. It
//! translates the simulator's per-step state into [`IntersectionObs`], enforces the
//! minimum and maximum green durations on [`SignalAct`]s, computes the reward and
//! handles simulator faults.
//!
//! Simulators implement [`Simulator`]. [`SyntheticIntersection`] is a small
//! queue-based simulator with seeded Bernoulli or periodic arrivals:
//!
//! ```rust
//! use tsc_core::{runner::EpisodeRunner, Env, Policy};
//! use tsc_env::{IntersectionEnvConfig, IntersectionObs, SignalAct, SyntheticConfig, SyntheticEnv};
//!
//! struct AlwaysExtend;
//!
//! impl Policy<SyntheticEnv> for AlwaysExtend {
//!     fn act(&mut self, _obs: &IntersectionObs) -> anyhow::Result<SignalAct> {
//!         Ok(SignalAct::Extend)
//!     }
//! }
//!
//! let config = IntersectionEnvConfig::<SyntheticConfig>::default().max_steps(20);
//! let mut runner = EpisodeRunner::<SyntheticEnv>::build(&config).unwrap();
//! let log = runner.run(&mut AlwaysExtend, 42, 100).unwrap();
//! assert_eq!(log.len(), 20);
//! ```
mod act;
mod env;
mod layout;
mod obs;
mod simulator;
mod synthetic;

pub use act::SignalAct;
pub use env::{IntersectionEnv, IntersectionEnvConfig, RewardWeights, StepInfo};
pub use layout::{IntersectionLayout, Movement, Phase};
pub use obs::IntersectionObs;
pub use simulator::{SimSnapshot, Simulator, SimulatorError};
pub use synthetic::{Demand, SyntheticConfig, SyntheticIntersection};

/// [`IntersectionEnv`] on the [`SyntheticIntersection`] simulator.
pub type SyntheticEnv = IntersectionEnv<SyntheticIntersection>;
