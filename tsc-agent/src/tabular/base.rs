//! Q table.
use super::{Discretizer, QueueDiscretizer};
use crate::{estimator::argmax, TargetSync, UpdateParams, ValueEstimator};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};
use tsc_core::{replay_buffer::TransitionBatch, Transition, TscError};

/// An explicit table of action values over discretized states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularQ {
    discretizer: QueueDiscretizer,
    n_actions: usize,
    learning_rate: f32,

    /// Row-major `n_states × n_actions`.
    table: Vec<f32>,
}

impl TabularQ {
    /// Creates a table of zeros.
    pub fn new(discretizer: QueueDiscretizer, n_actions: usize, learning_rate: f32) -> Self {
        let n_states = discretizer.n_states();
        Self {
            discretizer,
            n_actions,
            learning_rate,
            table: vec![0.0; n_states * n_actions],
        }
    }

    /// Number of discretized states.
    pub fn n_states(&self) -> usize {
        self.discretizer.n_states()
    }

    /// Learning rate α.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// The `n_states × n_actions` table, row-major.
    pub fn table(&self) -> &[f32] {
        &self.table
    }

    /// Values of all actions in a discretized state.
    pub fn row(&self, state: usize) -> &[f32] {
        &self.table[state * self.n_actions..(state + 1) * self.n_actions]
    }

    fn state(&self, features: &[f32]) -> Result<usize> {
        self.discretizer.index(features)
    }

    /// `Q[s, a] ← Q[s, a] + α (y − Q[s, a])`, returns the squared error before the step.
    fn apply(&mut self, s: usize, a: usize, y: f32) -> Result<f32> {
        if a >= self.n_actions {
            return Err(TscError::InvalidConfig(format!("action {} out of range", a)).into());
        }
        let q = &mut self.table[s * self.n_actions + a];
        let td = y - *q;
        let updated = *q + self.learning_rate * td;
        if !updated.is_finite() {
            return Err(TscError::NonFinite(format!("Q[{}, {}] = {}", s, a, updated)).into());
        }
        *q = updated;
        Ok(td * td)
    }

    /// Q-learning step bootstrapped on this table:
    /// `Q[s, a] ← Q[s, a] + α (r + γ max_a' Q[s', a'] − Q[s, a])`.
    pub fn update_direct(&mut self, tr: &Transition, params: &UpdateParams) -> Result<f32> {
        let s = self.state(tr.obs())?;
        let s_next = self.state(tr.next_obs())?;
        let (_, next_value) = argmax(self.row(s_next))?;
        let y = params.target(tr.reward(), tr.is_done(), next_value);
        self.apply(s, tr.act(), y)
    }
}

impl ValueEstimator for TabularQ {
    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn predict_all(&self, features: &[f32]) -> Result<Vec<f32>> {
        Ok(self.row(self.state(features)?).to_vec())
    }

    fn update(
        &mut self,
        batch: &TransitionBatch,
        target: &Self,
        params: &UpdateParams,
    ) -> Result<f32> {
        let targets = crate::bootstrap_targets(batch, target, params)?;
        let mut loss = 0.0;
        for (tr, &y) in batch.iter().zip(targets.iter()) {
            let s = self.state(tr.obs())?;
            loss += self.apply(s, tr.act(), y)?;
        }
        Ok(loss / batch.len().max(1) as f32)
    }

    fn sync_from(&mut self, online: &Self, sync: TargetSync) -> Result<()> {
        if self.table.len() != online.table.len() {
            return Err(TscError::InvalidConfig("Q tables of different sizes".to_string()).into());
        }
        match sync {
            TargetSync::Hard => self.table.copy_from_slice(&online.table),
            TargetSync::Soft { tau } => {
                let tau = tau as f32;
                for (dest, &src) in self.table.iter_mut().zip(online.table.iter()) {
                    *dest = tau * src + (1.0 - tau) * *dest;
                }
            }
        }
        Ok(())
    }

    /// Saves the estimator as JSON.
    fn save(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let rdr = BufReader::new(File::open(path)?);
        let loaded: Self = serde_json::from_reader(rdr)?;
        if loaded.table.len() != self.table.len() {
            return Err(TscError::InvalidConfig(format!(
                "Q table in {:?} has {} entries, expected {}",
                path,
                loaded.table.len(),
                self.table.len()
            ))
            .into());
        }
        *self = loaded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueueDiscretizerConfig;
    use tsc_core::FeatureLayout;

    fn q(alpha: f32) -> Result<TabularQ> {
        let d = QueueDiscretizer::build(&QueueDiscretizerConfig::default(), FeatureLayout::new(2, 2))?;
        Ok(TabularQ::new(d, 3, alpha))
    }

    fn features(q0: f32, q1: f32) -> Vec<f32> {
        vec![q0, q1, 0.0, 0.0, 1.0, 0.0, 1.0]
    }

    #[test]
    fn test_direct_update_matches_closed_form() -> Result<()> {
        let mut q = q(0.5)?;
        let params = UpdateParams {
            discount_factor: 0.9,
            ..Default::default()
        };
        let s = features(1.0, 0.0);
        let s_next = features(2.0, 0.0);
        q.update_direct(&Transition::new(s_next.clone(), 2, 4.0, s.clone(), false, false), &params)?;
        // Q[s_next, 2] = 0.5 * 4 = 2
        assert_eq!(q.predict(&s_next, 2)?, 2.0);

        q.update_direct(&Transition::new(s.clone(), 1, -1.0, s_next.clone(), false, false), &params)?;
        // 0 + 0.5 * (-1 + 0.9 * 2 - 0)
        assert!((q.predict(&s, 1)? - 0.4).abs() < 1e-6);
        assert_eq!(q.predict_best(&s)?, (1, q.predict(&s, 1)?));

        q.update_direct(&Transition::new(s.clone(), 0, -1.0, s_next, true, false), &params)?;
        assert_eq!(q.predict(&s, 0)?, -0.5);
        Ok(())
    }

    #[test]
    fn test_soft_sync() -> Result<()> {
        let mut online = q(1.0)?;
        let params = UpdateParams::default();
        let s = features(0.0, 0.0);
        online.update_direct(&Transition::new(s.clone(), 0, 10.0, s.clone(), true, false), &params)?;
        let mut target = q(1.0)?;
        target.sync_from(&online, TargetSync::Soft { tau: 0.25 })?;
        assert_eq!(target.predict(&s, 0)?, 2.5);
        target.sync_from(&online, TargetSync::Hard)?;
        assert_eq!(target.table(), online.table());
        Ok(())
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let dir = tempdir::TempDir::new("tabular")?;
        let path = dir.path().join("q.json");
        let mut a = q(1.0)?;
        let s = features(3.0, 1.0);
        a.update_direct(&Transition::new(s.clone(), 1, 7.0, s.clone(), true, false), &UpdateParams::default())?;
        a.save(&path)?;
        let mut b = q(1.0)?;
        b.load(&path)?;
        assert_eq!(a, b);
        Ok(())
    }
}
