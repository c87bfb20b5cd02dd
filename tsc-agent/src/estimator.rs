//! Value estimator interface.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tsc_core::{replay_buffer::TransitionBatch, TscError};

/// How the target estimator follows the online estimator.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum TargetSync {
    /// Copy the online parameters.
    Hard,

    /// Blend: `target = tau * online + (1 - tau) * target`.
    Soft {
        /// Blending coefficient in `(0, 1]`.
        tau: f64,
    },
}

impl Default for TargetSync {
    fn default() -> Self {
        Self::Hard
    }
}

/// Constants of a bootstrapped update.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct UpdateParams {
    /// Discount factor in `(0, 1)`.
    pub discount_factor: f32,

    /// Rewards are clipped to `[-reward_clip, reward_clip]`.
    pub reward_clip: f32,

    /// Targets are clipped to `[-target_clip, target_clip]`.
    pub target_clip: f32,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            discount_factor: 0.95,
            reward_clip: 100.0,
            target_clip: 1000.0,
        }
    }
}

impl UpdateParams {
    /// Bootstrapped target of one transition given the best next value.
    pub fn target(&self, reward: f32, is_done: bool, next_value: f32) -> f32 {
        let r = reward.clamp(-self.reward_clip, self.reward_clip);
        let q = if is_done { 0.0 } else { next_value };
        (r + self.discount_factor * q).clamp(-self.target_clip, self.target_clip)
    }
}

/// Maps a state feature vector and an action index to an expected return.
///
/// An agent owns two estimators of the same type: the online estimator is changed by
/// [`ValueEstimator::update`], the target estimator only by
/// [`ValueEstimator::sync_from`]. `update` borrows the target immutably, so a
/// synchronisation cannot happen while an update reads from it.
pub trait ValueEstimator {
    /// Number of actions.
    fn n_actions(&self) -> usize;

    /// Values of all actions.
    fn predict_all(&self, features: &[f32]) -> Result<Vec<f32>>;

    /// Value of an action.
    fn predict(&self, features: &[f32], act: usize) -> Result<f32> {
        let values = self.predict_all(features)?;
        values
            .get(act)
            .copied()
            .ok_or_else(|| TscError::InvalidConfig(format!("action {} out of range", act)).into())
    }

    /// Best action and its value; ties go to the lowest action index.
    fn predict_best(&self, features: &[f32]) -> Result<(usize, f32)> {
        argmax(&self.predict_all(features)?)
    }

    /// [`ValueEstimator::predict_best`] on several states.
    fn predict_best_batch(&self, features: &[&[f32]]) -> Result<Vec<(usize, f32)>> {
        features.iter().map(|f| self.predict_best(f)).collect()
    }

    /// Moves the predictions on `batch` toward the bootstrapped targets computed with
    /// `target`, returns the loss.
    fn update(
        &mut self,
        batch: &TransitionBatch,
        target: &Self,
        params: &UpdateParams,
    ) -> Result<f32>
    where
        Self: Sized;

    /// Copies or blends the parameters of `online` into `self`.
    fn sync_from(&mut self, online: &Self, sync: TargetSync) -> Result<()>
    where
        Self: Sized;

    /// Saves the parameters.
    fn save(&self, path: &Path) -> Result<()>;

    /// Loads the parameters.
    fn load(&mut self, path: &Path) -> Result<()>;
}

/// Index and value of the maximum; the first maximum wins.
pub(crate) fn argmax(values: &[f32]) -> Result<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(TscError::NonFinite(format!("value of action {} is {}", i, v)).into());
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.ok_or_else(|| TscError::InvalidConfig("estimator has no action".to_string()).into())
}

/// Bootstrapped targets `r + γ · max_a' Q_target(s', a')` of a batch, with the value of
/// terminal transitions set to 0.
pub fn bootstrap_targets<Q: ValueEstimator>(
    batch: &TransitionBatch,
    target: &Q,
    params: &UpdateParams,
) -> Result<Vec<f32>> {
    let next: Vec<&[f32]> = batch.iter().map(|t| t.next_obs()).collect();
    let best = target.predict_best_batch(&next)?;
    let targets: Vec<f32> = batch
        .iter()
        .zip(best.iter())
        .map(|(t, &(_, v))| params.target(t.reward(), t.is_done(), v))
        .collect();
    if let Some(y) = targets.iter().find(|y| !y.is_finite()) {
        return Err(TscError::NonFinite(format!("bootstrapped target {}", y)).into());
    }
    Ok(targets)
}
