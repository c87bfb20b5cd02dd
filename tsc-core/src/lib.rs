#![warn(missing_docs)]
//! Core abstractions for traffic-signal control experiments.
//!
//! This crate defines the contract shared by the environment, the controllers and the
//! evaluation harness: the [`Env`], [`Policy`] and [`Agent`] traits, [`Transition`]s,
//! the replay buffer used by learning agents and the [`EpisodeRunner`](runner::EpisodeRunner)
//! that drives any controller through an episode.
pub mod error;
pub mod record;
pub mod replay_buffer;
pub mod runner;
pub mod seed;

mod base;
pub use base::{
    Act, Agent, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase, Step,
    StepMetrics, Transition,
};
pub use error::TscError;

mod layout;
pub use layout::FeatureLayout;
pub use seed::{RunSeed, SeedStream};
