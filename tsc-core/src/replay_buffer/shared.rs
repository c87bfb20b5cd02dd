//! A replay buffer shared between threads.
use super::{SimpleReplayBuffer, SimpleReplayBufferConfig, TransitionBatch};
use crate::{ExperienceBufferBase, ReplayBufferBase, Transition, TscError};
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// A handle to a [`SimpleReplayBuffer`] guarded by a mutex.
///
/// Clones of the handle refer to the same buffer. `push` and `batch` hold the lock
/// for their whole duration, so a batch never observes a slot being evicted.
#[derive(Clone)]
pub struct SharedReplayBuffer {
    inner: Arc<Mutex<SimpleReplayBuffer>>,
}

impl SharedReplayBuffer {
    fn lock(&self) -> Result<MutexGuard<'_, SimpleReplayBuffer>, TscError> {
        self.inner
            .lock()
            .map_err(|e| TscError::LockPoisoned(format!("replay buffer: {}", e)))
    }
}

impl ExperienceBufferBase for SharedReplayBuffer {
    type Item = Transition;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.lock()?.push(tr)
    }

    /// Returns 0 if the lock is poisoned.
    fn len(&self) -> usize {
        self.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl ReplayBufferBase for SharedReplayBuffer {
    type Config = SimpleReplayBufferConfig;
    type Batch = TransitionBatch;

    fn build(config: &Self::Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimpleReplayBuffer::build(config))),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.lock()?.batch(size)
    }
}
