//! Agent.
use super::{Env, Policy};
use anyhow::Result;
use std::path::Path;

/// A controller that learns from the transitions passed to [`Policy::observe`].
pub trait Agent<E: Env>: Policy<E> {
    /// Switches to training: exploratory actions, updates in `observe`.
    fn train(&mut self);

    /// Switches to evaluation: greedy actions, `observe` leaves the parameters unchanged.
    fn eval(&mut self);

    /// Returns `true` in training mode.
    fn is_train(&self) -> bool;

    /// Writes the learned parameters into the directory `path`.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Reads parameters written by [`Agent::save_params`] from the directory `path`.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
