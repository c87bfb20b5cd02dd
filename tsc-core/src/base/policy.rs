//! Policy.
use super::{Env, Transition};
use crate::record::Record;
use anyhow::Result;

/// A controller on an environment.
///
/// Every controller maps an observation to an action. Learning controllers also
/// override [`Policy::observe`]; for the others it is a no-op, so the episode runner
/// can drive any controller through the same calls.
pub trait Policy<E: Env> {
    /// Selects an action given an observation.
    fn act(&mut self, obs: &E::Obs) -> Result<E::Act>;

    /// Receives the transition produced by the last action.
    ///
    /// Returns a record describing the update performed, if any.
    fn observe(&mut self, _transition: &Transition) -> Result<Option<Record>> {
        Ok(None)
    }

    /// Called by the episode runner before the first action of an episode.
    fn reset_episode(&mut self) {}
}
