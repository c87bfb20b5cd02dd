//! Multilayer perceptron action-value function.
mod base;
mod config;
pub use base::MlpQ;
pub use config::MlpQConfig;
