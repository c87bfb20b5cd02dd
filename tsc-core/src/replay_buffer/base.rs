//! Fixed-capacity ring buffer of transitions.
use super::{SimpleReplayBufferConfig, TransitionBatch};
use crate::{ExperienceBufferBase, ReplayBufferBase, Transition, TscError};
use anyhow::Result;
use rand::{rngs::StdRng, seq::index, SeedableRng};

/// A replay buffer with FIFO eviction and uniform sampling.
///
/// A batch is drawn without replacement; consecutive batches are independent, so a
/// transition may appear in several of them.
pub struct SimpleReplayBuffer {
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Slot written by the next push.
    i: usize,

    /// Stored transitions; grows up to `capacity`, then slots are overwritten.
    data: Vec<Transition>,

    rng: StdRng,
}

impl SimpleReplayBuffer {
    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the oldest stored transition, i.e. the next one to be evicted.
    pub fn oldest(&self) -> Option<&Transition> {
        if self.data.len() < self.capacity {
            self.data.first()
        } else {
            self.data.get(self.i)
        }
    }

    /// Iterates over the stored transitions from the oldest to the newest.
    pub fn iter_fifo(&self) -> impl Iterator<Item = &Transition> {
        let split = if self.data.len() < self.capacity {
            0
        } else {
            self.i
        };
        self.data[split..].iter().chain(self.data[..split].iter())
    }
}

impl ExperienceBufferBase for SimpleReplayBuffer {
    type Item = Transition;

    fn len(&self) -> usize {
        self.data.len()
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        if self.data.len() < self.capacity {
            self.data.push(tr);
        } else {
            self.data[self.i] = tr;
        }
        self.i = (self.i + 1) % self.capacity;
        Ok(())
    }
}

impl ReplayBufferBase for SimpleReplayBuffer {
    type Config = SimpleReplayBufferConfig;
    type Batch = TransitionBatch;

    fn build(config: &Self::Config) -> Self {
        // A zero capacity is rejected by `validate`; clamp so that the ring arithmetic
        // stays defined for unvalidated configs.
        let capacity = config.capacity.max(1);
        Self {
            capacity,
            i: 0,
            data: Vec::with_capacity(capacity),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let available = self.data.len();
        if available < size {
            return Err(TscError::InsufficientData {
                requested: size,
                available,
            }
            .into());
        }
        let ixs = index::sample(&mut self.rng, available, size).into_vec();
        let transitions = ixs.iter().map(|&ix| self.data[ix].clone()).collect();
        Ok(TransitionBatch::new(transitions, ixs))
    }
}
