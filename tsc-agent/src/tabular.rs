//! Tabular Q-learning.
mod agent;
mod base;
mod discretizer;
pub use agent::{TabularQAgent, TabularQAgentConfig};
pub use base::TabularQ;
pub use discretizer::{Discretizer, QueueDiscretizer, QueueDiscretizerConfig};
