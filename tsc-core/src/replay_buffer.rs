//! Experience replay.
//!
//! [`SimpleReplayBuffer`] is a fixed-capacity ring of [`Transition`](crate::Transition)s
//! with FIFO eviction and uniform sampling. It is owned by one agent within one run.
//! [`SharedReplayBuffer`] serialises access for the case where a buffer must be shared
//! between threads.
mod base;
mod batch;
mod config;
mod shared;
pub use base::SimpleReplayBuffer;
pub use batch::TransitionBatch;
pub use config::SimpleReplayBufferConfig;
pub use shared::SharedReplayBuffer;
