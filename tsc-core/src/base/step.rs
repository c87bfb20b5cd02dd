//! Environment step.
use super::Env;
use serde::{Deserialize, Serialize};

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Traffic measurements of a single environment step, used for episode summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Total number of queued vehicles after the step.
    pub total_queue: f32,

    /// Mean waiting time per queued vehicle after the step, 0 if nothing is queued.
    pub mean_waiting: f32,

    /// Number of vehicles that left the intersection during the step.
    pub departed: f32,
}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
pub struct Step<E: Env> {
    /// The action applied by the environment.
    pub act: E::Act,

    /// Observation.
    pub obs: E::Obs,

    /// Reward.
    pub reward: f32,

    /// The episode reached its step budget.
    pub is_terminated: bool,

    /// The episode was cut short by a simulator fault.
    pub is_truncated: bool,

    /// Traffic measurements.
    pub metrics: StepMetrics,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        metrics: StepMetrics,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            metrics,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
