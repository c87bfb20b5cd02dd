//! Core functionalities.
mod agent;
mod env;
mod policy;
mod replay_buffer;
mod step;
mod transition;
pub use agent::Agent;
pub use env::Env;
pub use policy::Policy;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
use std::fmt::Debug;
pub use step::{Info, Step, StepMetrics};
pub use transition::Transition;

/// An observation of the environment, i.e. the state handed to a controller.
///
/// Observations are immutable snapshots. Learned controllers consume them through the
/// fixed-length [`Obs::features`] vector, rule-based controllers through the
/// concrete type.
pub trait Obs: Clone + Debug {
    /// Returns the feature vector of the observation.
    ///
    /// The layout of the vector is described by the environment's
    /// [`FeatureLayout`](crate::FeatureLayout).
    fn features(&self) -> Vec<f32>;
}

/// An action of the environment.
///
/// Actions are enumerated so that value-based agents can address them by index.
pub trait Act: Clone + Debug {
    /// Returns the enumerated index of the action.
    fn index(&self) -> usize;

    /// Builds the action with the given index.
    fn from_index(ix: usize) -> Self;
}
