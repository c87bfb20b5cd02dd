//! Configuration of an evaluation.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tsc_agent::{DqnConfig, TabularQAgentConfig};
use tsc_baselines::{ActuatedConfig, FixedCycleConfig, MaxPressureConfig};
use tsc_core::{runner::Metric, TscError};
use tsc_env::IntersectionLayout;

/// Paired significance test between the learned controller and each baseline.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SignificanceTest {
    /// Paired t-test.
    #[default]
    PairedT,

    /// Wilcoxon signed-rank test.
    Wilcoxon,
}

impl SignificanceTest {
    /// Name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PairedT => "paired-t",
            Self::Wilcoxon => "wilcoxon",
        }
    }
}

/// Algorithm of a controller and its configuration.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum ControllerConfig {
    /// DQN agent.
    Dqn(DqnConfig),

    /// Tabular Q-learning agent.
    TabularQ(TabularQAgentConfig),

    /// Fixed-cycle controller.
    FixedCycle(FixedCycleConfig),

    /// Actuated controller.
    Actuated(ActuatedConfig),

    /// Max-pressure controller.
    MaxPressure(MaxPressureConfig),
}

impl ControllerConfig {
    /// Name of the algorithm.
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Dqn(_) => "dqn",
            Self::TabularQ(_) => "tabular-q",
            Self::FixedCycle(_) => "fixed-cycle",
            Self::Actuated(_) => "actuated",
            Self::MaxPressure(_) => "max-pressure",
        }
    }

    /// Returns `true` for controllers trained before evaluation.
    pub fn is_learned(&self) -> bool {
        matches!(self, Self::Dqn(_) | Self::TabularQ(_))
    }

    /// Checks the configuration against an intersection.
    pub fn validate(&self, layout: &IntersectionLayout) -> Result<()> {
        match self {
            Self::Dqn(c) => c.validate(),
            Self::TabularQ(c) => c.validate(),
            Self::FixedCycle(c) => c.validate(layout),
            Self::Actuated(c) => c.validate(),
            Self::MaxPressure(_) => layout.validate(),
        }
    }
}

/// A controller under evaluation.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ControllerEntry {
    /// Identifier used in reports.
    pub id: String,

    /// Algorithm and configuration.
    pub controller: ControllerConfig,
}

impl ControllerEntry {
    /// Creates an entry.
    pub fn new(id: impl Into<String>, controller: ControllerConfig) -> Self {
        Self {
            id: id.into(),
            controller,
        }
    }
}

/// Configuration of [`EvaluationHarness`](crate::EvaluationHarness).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EvaluationConfig {
    /// Controllers under evaluation.
    pub controllers: Vec<ControllerEntry>,

    /// Controller compared against every other controller, normally the learned one.
    pub learned_id: String,

    /// Evaluation seeds, shared by all controllers.
    pub seeds: Vec<u64>,

    /// Metrics reported.
    pub metrics: Vec<Metric>,

    /// Paired test.
    pub test: SignificanceTest,

    /// Level of the confidence intervals.
    pub confidence: f64,

    /// Number of worker threads.
    pub n_workers: usize,

    /// Maximum number of steps per episode.
    pub horizon: usize,

    /// Number of training episodes of learned controllers per seed.
    pub train_episodes: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            controllers: vec![
                ControllerEntry::new("dqn", ControllerConfig::Dqn(DqnConfig::default())),
                ControllerEntry::new(
                    "tabular-q",
                    ControllerConfig::TabularQ(TabularQAgentConfig::default()),
                ),
                ControllerEntry::new(
                    "fixed-cycle",
                    ControllerConfig::FixedCycle(FixedCycleConfig::default()),
                ),
                ControllerEntry::new("actuated", ControllerConfig::Actuated(ActuatedConfig::default())),
                ControllerEntry::new(
                    "max-pressure",
                    ControllerConfig::MaxPressure(MaxPressureConfig::default()),
                ),
            ],
            learned_id: "dqn".to_string(),
            seeds: (0..10).collect(),
            metrics: Metric::ALL.to_vec(),
            test: SignificanceTest::default(),
            confidence: 0.95,
            n_workers: 4,
            horizon: 60,
            train_episodes: 50,
        }
    }
}

impl EvaluationConfig {
    /// Sets the controllers.
    pub fn controllers(mut self, v: Vec<ControllerEntry>) -> Self {
        self.controllers = v;
        self
    }

    /// Adds a controller.
    pub fn controller(mut self, id: impl Into<String>, controller: ControllerConfig) -> Self {
        self.controllers.push(ControllerEntry::new(id, controller));
        self
    }

    /// Sets the id of the learned controller.
    pub fn learned_id(mut self, v: impl Into<String>) -> Self {
        self.learned_id = v.into();
        self
    }

    /// Sets the seeds.
    pub fn seeds(mut self, v: Vec<u64>) -> Self {
        self.seeds = v;
        self
    }

    /// Sets the metrics.
    pub fn metrics(mut self, v: Vec<Metric>) -> Self {
        self.metrics = v;
        self
    }

    /// Sets the significance test.
    pub fn test(mut self, v: SignificanceTest) -> Self {
        self.test = v;
        self
    }

    /// Sets the confidence level.
    pub fn confidence(mut self, v: f64) -> Self {
        self.confidence = v;
        self
    }

    /// Sets the number of workers.
    pub fn n_workers(mut self, v: usize) -> Self {
        self.n_workers = v;
        self
    }

    /// Sets the horizon.
    pub fn horizon(mut self, v: usize) -> Self {
        self.horizon = v;
        self
    }

    /// Sets the number of training episodes.
    pub fn train_episodes(mut self, v: usize) -> Self {
        self.train_episodes = v;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(TscError::InvalidConfig(msg).into()) };
        if self.seeds.len() < 2 {
            return Err(TscError::InsufficientSeeds(self.seeds.len()).into());
        }
        if self.seeds.iter().collect::<HashSet<_>>().len() != self.seeds.len() {
            return invalid(format!("duplicate seeds in {:?}", self.seeds));
        }
        if self.controllers.is_empty() {
            return invalid("no controller to evaluate".to_string());
        }
        let ids: HashSet<&str> = self.controllers.iter().map(|c| c.id.as_str()).collect();
        if ids.len() != self.controllers.len() {
            return invalid("duplicate controller ids".to_string());
        }
        if !ids.contains(self.learned_id.as_str()) {
            return invalid(format!("unknown learned controller {}", self.learned_id));
        }
        if self.metrics.is_empty() {
            return invalid("no metric to report".to_string());
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return invalid(format!("confidence must be in (0, 1), got {}", self.confidence));
        }
        if self.n_workers == 0 {
            return invalid("n_workers must be positive".to_string());
        }
        if self.horizon == 0 {
            return invalid("horizon must be positive".to_string());
        }
        Ok(())
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(config: &EvaluationConfig) -> Option<TscError> {
        config
            .validate()
            .err()
            .and_then(|e| e.downcast_ref::<TscError>().cloned())
    }

    #[test]
    fn test_default_is_valid() {
        assert!(EvaluationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let base = EvaluationConfig::default();
        assert_eq!(
            kind(&base.clone().seeds(vec![3])),
            Some(TscError::InsufficientSeeds(1))
        );
        assert_eq!(
            kind(&base.clone().seeds(vec![])),
            Some(TscError::InsufficientSeeds(0))
        );
        for config in [
            base.clone().seeds(vec![1, 2, 1]),
            base.clone().controllers(vec![]),
            base.clone().learned_id("ppo"),
            base.clone().controller("dqn", ControllerConfig::Actuated(ActuatedConfig::default())),
            base.clone().confidence(1.0),
            base.clone().n_workers(0),
            base.clone().horizon(0),
            base.clone().metrics(vec![]),
        ] {
            assert!(matches!(kind(&config), Some(TscError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_controller_config() {
        let layout = IntersectionLayout::two_way();
        let c = ControllerConfig::FixedCycle(FixedCycleConfig::default().durations(vec![10]));
        assert!(c.validate(&layout).is_err());
        assert!(!c.is_learned());
        assert_eq!(c.algorithm(), "fixed-cycle");
        assert!(ControllerConfig::TabularQ(TabularQAgentConfig::default()).is_learned());
    }
}
