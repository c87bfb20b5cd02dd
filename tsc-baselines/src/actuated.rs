use anyhow::Result;
use serde::{Deserialize, Serialize};
use tsc_core::{Policy, TscError};
use tsc_env::{IntersectionEnv, IntersectionLayout, IntersectionObs, SignalAct, Simulator};

/// Configuration of [`Actuated`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ActuatedConfig {
    /// The current phase is held for at least this many steps.
    pub min_green: usize,

    /// The current phase is not extended beyond this many steps.
    pub max_green: usize,

    /// The phase is extended while the occupancy of one of its detectors exceeds this
    /// value.
    pub occupancy_threshold: f32,
}

impl Default for ActuatedConfig {
    fn default() -> Self {
        Self {
            min_green: 5,
            max_green: 30,
            occupancy_threshold: 0.0,
        }
    }
}

impl ActuatedConfig {
    /// Sets the minimum green.
    pub fn min_green(mut self, v: usize) -> Self {
        self.min_green = v;
        self
    }

    /// Sets the maximum green.
    pub fn max_green(mut self, v: usize) -> Self {
        self.max_green = v;
        self
    }

    /// Sets the occupancy threshold.
    pub fn occupancy_threshold(mut self, v: f32) -> Self {
        self.occupancy_threshold = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.min_green > self.max_green {
            return Err(TscError::InvalidConfig(format!(
                "min_green {} exceeds max_green {}",
                self.min_green, self.max_green
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&self.occupancy_threshold) {
            return Err(TscError::InvalidConfig(format!(
                "occupancy threshold must be in [0, 1], got {}",
                self.occupancy_threshold
            ))
            .into());
        }
        Ok(())
    }
}

/// Vehicle-actuated control.
///
/// * Before `min_green` steps the current phase is always extended.
/// * Afterwards it is extended while a detector of the phase reports an occupancy above
///   the threshold, up to `max_green` steps.
/// * Otherwise the controller activates the phase with the longest queue among the
///   other phases with waiting vehicles. Equal queues go to the phase that comes first
///   in the cycle after the current one. Without demand elsewhere the phase is
///   extended.
pub struct Actuated {
    config: ActuatedConfig,
    approaches: Vec<Vec<usize>>,
}

impl Actuated {
    /// Builds the controller for an intersection.
    pub fn build(config: &ActuatedConfig, layout: &IntersectionLayout) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            approaches: layout.phases.iter().map(|p| p.approaches()).collect(),
        })
    }

    fn queue(&self, obs: &IntersectionObs, phase: usize) -> f32 {
        self.approaches[phase].iter().map(|&a| obs.queues[a]).sum()
    }

    /// Action for an observation.
    pub fn decide(&self, obs: &IntersectionObs) -> SignalAct {
        if obs.elapsed < self.config.min_green {
            return SignalAct::Extend;
        }

        let occupied = self.approaches[obs.phase]
            .iter()
            .any(|&a| obs.occupancy[a] > self.config.occupancy_threshold);
        if occupied && obs.elapsed < self.config.max_green {
            return SignalAct::Extend;
        }

        let n = self.approaches.len();
        let mut best: Option<(usize, f32)> = None;
        for k in 1..n {
            let p = (obs.phase + k) % n;
            let q = self.queue(obs, p);
            if q <= 0.0 {
                continue;
            }
            match best {
                Some((_, b)) if q <= b => {}
                _ => best = Some((p, q)),
            }
        }
        match best {
            Some((p, _)) => SignalAct::Activate(p),
            None => SignalAct::Extend,
        }
    }
}

impl<S: Simulator> Policy<IntersectionEnv<S>> for Actuated {
    fn act(&mut self, obs: &IntersectionObs) -> Result<SignalAct> {
        Ok(self.decide(obs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsc_env::Phase;

    fn obs(queues: &[f32], phase: usize, elapsed: usize) -> IntersectionObs {
        IntersectionObs {
            queues: queues.to_vec(),
            waiting: vec![0.0; queues.len()],
            outgoing: vec![0.0; queues.len()],
            occupancy: queues.iter().map(|q| (q / 10.0).min(1.0)).collect(),
            phase,
            elapsed,
            n_phases: 3,
        }
    }

    fn three_phase() -> IntersectionLayout {
        IntersectionLayout {
            approaches: vec!["a".into(), "b".into(), "c".into()],
            links: vec!["x".into(), "y".into(), "z".into()],
            phases: vec![
                Phase::new("a", &[(0, 0)]),
                Phase::new("b", &[(1, 1)]),
                Phase::new("c", &[(2, 2)]),
            ],
        }
    }

    #[test]
    fn test_holds_min_green() -> Result<()> {
        let ctl = Actuated::build(&ActuatedConfig::default(), &three_phase())?;
        // empty current phase, long queues elsewhere
        for elapsed in 0..5 {
            assert_eq!(ctl.decide(&obs(&[0.0, 30.0, 40.0], 0, elapsed)), SignalAct::Extend);
        }
        assert_eq!(ctl.decide(&obs(&[0.0, 30.0, 40.0], 0, 5)), SignalAct::Activate(2));
        Ok(())
    }

    #[test]
    fn test_extends_while_occupied_until_max_green() -> Result<()> {
        let ctl = Actuated::build(&ActuatedConfig::default(), &three_phase())?;
        assert_eq!(ctl.decide(&obs(&[2.0, 30.0, 0.0], 0, 10)), SignalAct::Extend);
        assert_eq!(ctl.decide(&obs(&[2.0, 30.0, 0.0], 0, 30)), SignalAct::Activate(1));
        Ok(())
    }

    #[test]
    fn test_ties_follow_cycle_order() -> Result<()> {
        let ctl = Actuated::build(&ActuatedConfig::default(), &three_phase())?;
        assert_eq!(ctl.decide(&obs(&[3.0, 0.0, 3.0], 1, 8)), SignalAct::Activate(2));
        assert_eq!(ctl.decide(&obs(&[4.0, 0.0, 4.0], 2, 8)), SignalAct::Extend);
        assert_eq!(ctl.decide(&obs(&[0.0, 4.0, 4.0], 0, 8)), SignalAct::Activate(1));
        Ok(())
    }

    #[test]
    fn test_no_demand_elsewhere_extends() -> Result<()> {
        let ctl = Actuated::build(&ActuatedConfig::default(), &three_phase())?;
        assert_eq!(ctl.decide(&obs(&[0.0, 0.0, 0.0], 1, 50)), SignalAct::Extend);
        Ok(())
    }

    #[test]
    fn test_invalid_threshold() {
        let config = ActuatedConfig::default().occupancy_threshold(1.5);
        assert!(Actuated::build(&config, &three_phase()).is_err());
    }
}
