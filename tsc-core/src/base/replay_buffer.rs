//! Replay buffer interface.
use anyhow::Result;

/// A store of transitions filled by an agent.
pub trait ExperienceBufferBase {
    /// Stored item.
    type Item;

    /// Stores an item, evicting the oldest one when the buffer is full.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Number of stored items.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A buffer sampled in batches for value updates.
pub trait ReplayBufferBase {
    /// Configuration.
    type Config: Clone;

    /// Sampled batch.
    type Batch;

    /// Builds an empty buffer.
    fn build(config: &Self::Config) -> Self;

    /// Samples `size` distinct items uniformly at random.
    ///
    /// Fails with [`TscError::InsufficientData`](crate::TscError::InsufficientData)
    /// when fewer than `size` experiences are stored; a short batch is never returned.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
