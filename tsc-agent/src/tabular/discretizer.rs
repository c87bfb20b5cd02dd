//! State discretization.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tsc_core::{FeatureLayout, TscError};

/// Maps a feature vector to a finite state index.
pub trait Discretizer {
    /// Number of states.
    fn n_states(&self) -> usize;

    /// Index of the state of a feature vector.
    fn index(&self, features: &[f32]) -> Result<usize>;
}

/// Configuration of [`QueueDiscretizer`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct QueueDiscretizerConfig {
    /// Queue lengths are capped at this value.
    pub max_queue: usize,

    /// Width of a queue bucket.
    pub queue_bin: usize,

    /// Upper bounds of the elapsed-duration buckets. Empty means the elapsed duration
    /// is ignored.
    pub elapsed_edges: Vec<usize>,
}

impl Default for QueueDiscretizerConfig {
    fn default() -> Self {
        Self {
            max_queue: 10,
            queue_bin: 1,
            elapsed_edges: vec![],
        }
    }
}

impl QueueDiscretizerConfig {
    /// Sets the queue cap.
    pub fn max_queue(mut self, v: usize) -> Self {
        self.max_queue = v;
        self
    }

    /// Sets the queue bucket width.
    pub fn queue_bin(mut self, v: usize) -> Self {
        self.queue_bin = v;
        self
    }

    /// Sets the elapsed-duration bucket bounds.
    pub fn elapsed_edges(mut self, v: Vec<usize>) -> Self {
        self.elapsed_edges = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.queue_bin == 0 {
            return Err(TscError::InvalidConfig("queue_bin must be positive".to_string()).into());
        }
        if self.elapsed_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TscError::InvalidConfig(
                "elapsed_edges must be strictly increasing".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Discretizes queues, current phase and elapsed duration into a mixed-radix index.
///
/// Each queue length is capped at `max_queue` and divided by `queue_bin`. The elapsed
/// duration falls in the first bucket whose upper bound it does not exceed, or in the
/// last bucket.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct QueueDiscretizer {
    config: QueueDiscretizerConfig,
    layout: FeatureLayout,
}

impl QueueDiscretizer {
    /// Builds the discretizer for a feature layout.
    pub fn build(config: &QueueDiscretizerConfig, layout: FeatureLayout) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            layout,
        })
    }

    fn n_queue_levels(&self) -> usize {
        self.config.max_queue / self.config.queue_bin + 1
    }

    fn n_elapsed_levels(&self) -> usize {
        self.config.elapsed_edges.len() + 1
    }

    fn queue_level(&self, q: f32) -> usize {
        let q = (q.max(0.0) as usize).min(self.config.max_queue);
        q / self.config.queue_bin
    }

    fn elapsed_level(&self, elapsed: f32) -> usize {
        let elapsed = elapsed.max(0.0) as usize;
        self.config
            .elapsed_edges
            .iter()
            .position(|&edge| elapsed <= edge)
            .unwrap_or(self.config.elapsed_edges.len())
    }
}

impl Discretizer for QueueDiscretizer {
    fn n_states(&self) -> usize {
        self.n_queue_levels().pow(self.layout.n_approaches as u32)
            * self.layout.n_phases
            * self.n_elapsed_levels()
    }

    fn index(&self, features: &[f32]) -> Result<usize> {
        if features.len() != self.layout.dim() {
            return Err(TscError::MalformedState(format!(
                "feature vector of length {}, expected {}",
                features.len(),
                self.layout.dim()
            ))
            .into());
        }
        let phase = self.layout.decode_phase(features).ok_or_else(|| {
            TscError::MalformedState("feature vector without current phase".to_string())
        })?;

        let mut ix = 0;
        for &q in features[self.layout.queues()].iter() {
            ix = ix * self.n_queue_levels() + self.queue_level(q);
        }
        ix = ix * self.layout.n_phases + phase;
        ix = ix * self.n_elapsed_levels() + self.elapsed_level(features[self.layout.elapsed()]);
        Ok(ix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(queues: [f32; 2], phase: usize, elapsed: f32) -> Vec<f32> {
        let mut v = vec![queues[0], queues[1], 0.0, 0.0, 0.0, 0.0, elapsed];
        v[4 + phase] = 1.0;
        v
    }

    #[test]
    fn test_default_discretizer() -> Result<()> {
        let d = QueueDiscretizer::build(&Default::default(), FeatureLayout::new(2, 2))?;
        assert_eq!(d.n_states(), 11 * 11 * 2);
        assert_eq!(d.index(&features([0.0, 0.0], 0, 5.0))?, 0);
        assert_eq!(d.index(&features([0.0, 0.0], 1, 5.0))?, 1);
        assert_eq!(d.index(&features([1.0, 2.0], 0, 0.0))?, (11 + 2) * 2);
        // queues beyond the cap share a state
        assert_eq!(
            d.index(&features([25.0, 3.0], 1, 0.0))?,
            d.index(&features([10.0, 3.0], 1, 0.0))?
        );
        let max = d.index(&features([99.0, 99.0], 1, 0.0))?;
        assert_eq!(max, d.n_states() - 1);
        Ok(())
    }

    #[test]
    fn test_bins_and_elapsed_buckets() -> Result<()> {
        let config = QueueDiscretizerConfig::default()
            .max_queue(9)
            .queue_bin(3)
            .elapsed_edges(vec![2, 5]);
        let d = QueueDiscretizer::build(&config, FeatureLayout::new(2, 2))?;
        assert_eq!(d.n_states(), 4 * 4 * 2 * 3);
        let a = d.index(&features([4.0, 5.0], 0, 1.0))?;
        let b = d.index(&features([3.0, 3.0], 0, 2.0))?;
        assert_eq!(a, b);
        let c = d.index(&features([3.0, 3.0], 0, 3.0))?;
        let e = d.index(&features([3.0, 3.0], 0, 40.0))?;
        assert_eq!(c, b + 1);
        assert_eq!(e, b + 2);
        Ok(())
    }

    #[test]
    fn test_malformed_features() -> Result<()> {
        let d = QueueDiscretizer::build(&Default::default(), FeatureLayout::new(2, 2))?;
        assert!(d.index(&[1.0, 2.0]).is_err());
        assert!(d.index(&[1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0]).is_err());
        Ok(())
    }
}
