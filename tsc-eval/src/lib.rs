#![warn(missing_docs)]
//! Multi-seed evaluation of traffic-signal controllers.
//!
//! [`EvaluationHarness`] runs every configured controller on every seed, trains the
//! learned ones first, and turns the episode summaries into an [`EvaluationReport`]:
//! per-controller means with t-based confidence intervals and paired tests (paired t
//! or Wilcoxon signed-rank) of the learned controller against each baseline.
//!
//! ```no_run
//! use tsc_eval::{EvaluationConfig, EvaluationHarness};
//! use tsc_env::{IntersectionEnvConfig, SyntheticConfig, SyntheticIntersection};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = EvaluationConfig::default().seeds((0..5).collect());
//! let env_config = IntersectionEnvConfig::<SyntheticConfig>::default();
//! let harness = EvaluationHarness::<SyntheticIntersection>::build(&config, &env_config)?;
//! harness.run()?.save_json("report.json")?;
//! # Ok(())
//! # }
//! ```
mod config;
mod controller;
mod harness;
mod pool;
mod report;
pub mod stats;
pub use config::{ControllerConfig, ControllerEntry, EvaluationConfig, SignificanceTest};
pub use controller::Controller;
pub use harness::{EvaluationHarness, RunOutcome};
pub use pool::WorkerPool;
pub use report::{
    EvaluationReport, FailedRun, MetricSummary, PairedComparison, QualityFlag, TrainingCurve,
};
