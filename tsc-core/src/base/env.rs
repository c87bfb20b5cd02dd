//! Environment.
use super::{Act, Info, Obs, Step};
use crate::{record::Record, FeatureLayout};
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// The environment is the only component allowed to talk to the underlying
/// simulator. It owns the clock of the simulation and enforces the step budget of
/// an episode.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment.
    fn build(config: &Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Resets the environment with the given seed and returns the initial observation.
    fn reset(&mut self, seed: u64) -> Result<Self::Obs>;

    /// Performs an environment step.
    ///
    /// The returned [`Step`] holds the action actually applied, which may differ from
    /// `a` when the environment enforces phase-duration constraints.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Number of enumerated actions.
    fn n_actions(&self) -> usize;

    /// Layout of [`Obs::features`].
    fn layout(&self) -> FeatureLayout;
}
