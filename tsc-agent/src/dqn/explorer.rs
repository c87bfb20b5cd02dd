//! Epsilon-greedy exploration.
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tsc_core::TscError;

/// Shape of the decay of the exploration rate.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub enum EpsilonSchedule {
    /// `eps_start` decreases by a constant amount per step until `eps_min`.
    Linear,

    /// `eps_start` is multiplied by a constant factor per step until `eps_min`.
    Exponential,
}

/// Epsilon-greedy explorer.
///
/// The exploration rate decays monotonically from `eps_start` at step 0 to `eps_min`
/// at `decay_steps` and stays there.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Decay schedule.
    pub schedule: EpsilonSchedule,

    /// Exploration rate at step 0.
    pub eps_start: f64,

    /// Final exploration rate.
    pub eps_min: f64,

    /// Number of steps to reach `eps_min`.
    pub decay_steps: usize,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            schedule: EpsilonSchedule::Linear,
            eps_start: 1.0,
            eps_min: 0.05,
            decay_steps: 5000,
        }
    }
}

impl EpsilonGreedy {
    /// A constant exploration rate.
    pub fn constant(eps: f64) -> Self {
        Self {
            schedule: EpsilonSchedule::Linear,
            eps_start: eps,
            eps_min: eps,
            decay_steps: 1,
        }
    }

    /// Sets the schedule.
    pub fn schedule(mut self, v: EpsilonSchedule) -> Self {
        self.schedule = v;
        self
    }

    /// Set the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Set the final epsilon value.
    pub fn eps_min(mut self, v: f64) -> Self {
        self.eps_min = v;
        self
    }

    /// Sets the number of decay steps.
    pub fn decay_steps(mut self, v: usize) -> Self {
        self.decay_steps = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.eps_start) || !in_unit(self.eps_min) || self.eps_min > self.eps_start {
            return Err(TscError::InvalidConfig(format!(
                "invalid exploration rates: eps_start = {}, eps_min = {}",
                self.eps_start, self.eps_min
            ))
            .into());
        }
        if self.decay_steps == 0 {
            return Err(TscError::InvalidConfig("decay_steps must be positive".to_string()).into());
        }
        Ok(())
    }

    /// Exploration rate at a step.
    pub fn eps(&self, step: usize) -> f64 {
        if step >= self.decay_steps || self.eps_start <= self.eps_min {
            return self.eps_min;
        }
        let frac = step as f64 / self.decay_steps as f64;
        let eps = match self.schedule {
            EpsilonSchedule::Linear => self.eps_start - (self.eps_start - self.eps_min) * frac,
            EpsilonSchedule::Exponential => {
                if self.eps_min > 0.0 {
                    self.eps_start * (self.eps_min / self.eps_start).powf(frac)
                } else {
                    // decay to 1% of the start, then jump to 0 at `decay_steps`
                    self.eps_start * 0.01f64.powf(frac)
                }
            }
        };
        eps.max(self.eps_min)
    }

    /// Returns `true` if the action of this step is to be drawn at random.
    pub fn explore(&self, step: usize, rng: &mut impl Rng) -> bool {
        rng.gen::<f64>() < self.eps(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedules_are_monotone_and_reach_min() {
        for schedule in [EpsilonSchedule::Linear, EpsilonSchedule::Exponential] {
            for eps_min in [0.0, 0.05] {
                let e = EpsilonGreedy::default()
                    .schedule(schedule)
                    .eps_min(eps_min)
                    .decay_steps(100);
                assert_eq!(e.eps(0), 1.0);
                let mut prev = e.eps(0);
                for step in 1..200 {
                    let eps = e.eps(step);
                    assert!(eps <= prev);
                    assert!(eps >= eps_min);
                    prev = eps;
                }
                assert_eq!(e.eps(100), eps_min);
            }
        }
        assert!((EpsilonGreedy::default().decay_steps(10).eps(5) - 0.525).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(EpsilonGreedy::default().validate().is_ok());
        assert!(EpsilonGreedy::default().eps_min(0.5).eps_start(0.2).validate().is_err());
        assert!(EpsilonGreedy::default().eps_start(1.5).validate().is_err());
        assert!(EpsilonGreedy::default().decay_steps(0).validate().is_err());
        assert!(EpsilonGreedy::constant(0.1).validate().is_ok());
    }
}
