use anyhow::Result;
use serde::{Deserialize, Serialize};
use tsc_core::TscError;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`MlpQ`](super::MlpQ).
pub struct MlpQConfig {
    /// Number of units of the hidden layers.
    pub units: Vec<usize>,

    /// Learning rate of the AdamW optimizer.
    pub learning_rate: f64,

    /// Weight decay of the AdamW optimizer.
    pub weight_decay: f64,

    /// Features are multiplied by this factor before the first layer.
    pub input_scale: f32,
}

impl Default for MlpQConfig {
    fn default() -> Self {
        Self {
            units: vec![64, 64],
            learning_rate: 1e-3,
            weight_decay: 0.0,
            input_scale: 0.1,
        }
    }
}

impl MlpQConfig {
    /// Sets the hidden layers.
    pub fn units(mut self, v: Vec<usize>) -> Self {
        self.units = v;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.learning_rate = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate >= 0.0) || !(self.weight_decay >= 0.0) {
            return Err(TscError::InvalidConfig(format!(
                "learning rate and weight decay must be non-negative, got {} and {}",
                self.learning_rate, self.weight_decay
            ))
            .into());
        }
        if self.units.iter().any(|&u| u == 0) {
            return Err(TscError::InvalidConfig("hidden layer without unit".to_string()).into());
        }
        Ok(())
    }
}
