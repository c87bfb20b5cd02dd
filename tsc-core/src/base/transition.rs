//! Transition.
use super::{Act, Env, Obs, Step};
use serde::{Deserialize, Serialize};

/// A transition `(o_t, a_t, r_t, o_t+1, done_t)`.
///
/// Transitions are the unit stored in replay buffers and episode logs. They are
/// immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    obs: Vec<f32>,
    act: usize,
    reward: f32,
    next_obs: Vec<f32>,
    is_terminated: bool,
    is_truncated: bool,
}

impl Transition {
    /// Constructs a transition.
    pub fn new(
        obs: Vec<f32>,
        act: usize,
        reward: f32,
        next_obs: Vec<f32>,
        is_terminated: bool,
        is_truncated: bool,
    ) -> Self {
        Self {
            obs,
            act,
            reward,
            next_obs,
            is_terminated,
            is_truncated,
        }
    }

    /// Builds the transition leading from `prev_obs` to the observation in `step`.
    pub fn from_step<E: Env>(prev_obs: &E::Obs, step: &Step<E>) -> Self {
        Self::new(
            prev_obs.features(),
            step.act.index(),
            step.reward,
            step.obs.features(),
            step.is_terminated,
            step.is_truncated,
        )
    }

    /// `o_t`.
    pub fn obs(&self) -> &[f32] {
        &self.obs
    }

    /// `a_t`.
    pub fn act(&self) -> usize {
        self.act
    }

    /// `r_t`.
    pub fn reward(&self) -> f32 {
        self.reward
    }

    /// `o_t+1`.
    pub fn next_obs(&self) -> &[f32] {
        &self.next_obs
    }

    /// The episode ended with this transition.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }

    /// The episode ended because of its step budget.
    pub fn is_terminated(&self) -> bool {
        self.is_terminated
    }

    /// The episode ended because of a simulator fault.
    pub fn is_truncated(&self) -> bool {
        self.is_truncated
    }

    /// Returns `true` if the reward and both state vectors are finite.
    pub fn is_finite(&self) -> bool {
        self.reward.is_finite()
            && self.obs.iter().all(|v| v.is_finite())
            && self.next_obs.iter().all(|v| v.is_finite())
    }
}
