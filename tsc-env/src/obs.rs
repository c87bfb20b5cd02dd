use tsc_core::{FeatureLayout, Obs};

/// Observation of an intersection at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionObs {
    /// Queued vehicles per incoming approach.
    pub queues: Vec<f32>,

    /// Accumulated waiting time of the queued vehicles per incoming approach.
    pub waiting: Vec<f32>,

    /// Queued vehicles per outgoing link.
    pub outgoing: Vec<f32>,

    /// Detector occupancy in `[0, 1]` per incoming approach.
    pub occupancy: Vec<f32>,

    /// Current phase.
    pub phase: usize,

    /// Number of steps the current phase has been green.
    pub elapsed: usize,

    /// Number of phases of the intersection.
    pub n_phases: usize,
}

impl IntersectionObs {
    /// Layout of [`Obs::features`].
    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout::new(self.queues.len(), self.n_phases)
    }

    /// Total number of queued vehicles.
    pub fn total_queue(&self) -> f32 {
        self.queues.iter().sum()
    }
}

impl Obs for IntersectionObs {
    fn features(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(self.layout().dim());
        v.extend_from_slice(&self.queues);
        v.extend_from_slice(&self.waiting);
        v.extend((0..self.n_phases).map(|p| if p == self.phase { 1.0 } else { 0.0 }));
        v.push(self.elapsed as f32);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_follow_layout() {
        let obs = IntersectionObs {
            queues: vec![3.0, 1.0],
            waiting: vec![6.0, 0.0],
            outgoing: vec![0.0, 0.0],
            occupancy: vec![0.3, 0.1],
            phase: 1,
            elapsed: 4,
            n_phases: 2,
        };
        let f = obs.features();
        let layout = obs.layout();
        assert_eq!(f.len(), layout.dim());
        assert_eq!(&f[layout.queues()], &[3.0, 1.0]);
        assert_eq!(&f[layout.waiting()], &[6.0, 0.0]);
        assert_eq!(layout.decode_phase(&f), Some(1));
        assert_eq!(f[layout.elapsed()], 4.0);
    }
}
