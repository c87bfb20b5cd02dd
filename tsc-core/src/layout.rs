use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Layout of the observation feature vector of an intersection.
///
/// The vector is `[queues, waiting, phase one-hot, elapsed]` where queues and
/// waiting times have one entry per approach and the phase one-hot has one entry per
/// signal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureLayout {
    /// Number of incoming approaches.
    pub n_approaches: usize,

    /// Number of signal phases.
    pub n_phases: usize,
}

impl FeatureLayout {
    /// Constructs a layout.
    pub fn new(n_approaches: usize, n_phases: usize) -> Self {
        Self {
            n_approaches,
            n_phases,
        }
    }

    /// Length of the feature vector.
    pub fn dim(&self) -> usize {
        2 * self.n_approaches + self.n_phases + 1
    }

    /// Positions of the per-approach queue lengths.
    pub fn queues(&self) -> Range<usize> {
        0..self.n_approaches
    }

    /// Positions of the per-approach waiting times.
    pub fn waiting(&self) -> Range<usize> {
        self.n_approaches..2 * self.n_approaches
    }

    /// Positions of the phase one-hot encoding.
    pub fn phase(&self) -> Range<usize> {
        2 * self.n_approaches..2 * self.n_approaches + self.n_phases
    }

    /// Position of the elapsed duration of the current phase.
    pub fn elapsed(&self) -> usize {
        2 * self.n_approaches + self.n_phases
    }

    /// Number of actions of an environment with this layout: extend plus one per phase.
    pub fn n_actions(&self) -> usize {
        self.n_phases + 1
    }

    /// Decodes the current phase from a feature vector.
    pub fn decode_phase(&self, features: &[f32]) -> Option<usize> {
        features
            .get(self.phase())?
            .iter()
            .position(|&v| v > 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_vector() {
        let layout = FeatureLayout::new(4, 2);
        assert_eq!(layout.dim(), 11);
        assert_eq!(layout.queues(), 0..4);
        assert_eq!(layout.waiting(), 4..8);
        assert_eq!(layout.phase(), 8..10);
        assert_eq!(layout.elapsed(), 10);
        let mut v = vec![0f32; 11];
        v[9] = 1.0;
        assert_eq!(layout.decode_phase(&v), Some(1));
    }
}
