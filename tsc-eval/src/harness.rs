//! Evaluation harness.
use crate::{Controller, ControllerEntry, EvaluationConfig, EvaluationReport, WorkerPool};
use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tsc_core::{
    runner::{EpisodeRunner, EpisodeStatus, EpisodeSummary},
    Env, RunSeed, SeedStream,
};
use tsc_env::{IntersectionEnv, IntersectionEnvConfig, Simulator};

/// Outcome of one (controller, seed) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Controller id.
    pub controller_id: String,

    /// Evaluation seed.
    pub seed: u64,

    /// Status of the evaluation episode.
    pub status: EpisodeStatus,

    /// Summary of the evaluation episode.
    pub summary: EpisodeSummary,

    /// Mean queue length of each training episode (learned controllers only).
    pub training_curve: Vec<f32>,
}

/// Runs every controller on every seed and compares them.
///
/// Each (controller, seed) run builds its own environment and controller, so runs are
/// independent and are spread over a [`WorkerPool`]. For a run with seed `s`:
///
/// * a learned controller is trained for `train_episodes` episodes on the environment
///   seeds `RunSeed(s).derive(Training(k))`, then switched to evaluation mode;
/// * the evaluation episode uses the environment seed `RunSeed(s).derive(Environment)`,
///   identical for all controllers.
///
/// A truncated or failed evaluation episode is reported in
/// [`EvaluationReport::failed_runs`] and left out of the statistics. Any other error,
/// such as a simulator that cannot be reset, aborts the evaluation.
#[cfg_attr(doc, aquamarine::aquamarine)]
/// ```mermaid
/// flowchart LR
///   C[EvaluationConfig] --> J["jobs (controller x seed)"]
///   J --> P[WorkerPool]
///   P --> R1[run 1]
///   P --> R2[run 2]
///   P --> Rn[run n]
///   R1 --> M[merge in job order]
///   R2 --> M
///   Rn --> M
///   M --> E[EvaluationReport]
/// ```
pub struct EvaluationHarness<S: Simulator> {
    config: EvaluationConfig,
    env_config: IntersectionEnvConfig<S::Config>,
}

impl<S> EvaluationHarness<S>
where
    S: Simulator,
    S::Config: Send + Sync,
{
    /// Validates the configurations and creates the harness.
    ///
    /// Configuration errors are reported here, before any episode runs.
    pub fn build(config: &EvaluationConfig, env_config: &IntersectionEnvConfig<S::Config>) -> Result<Self> {
        config.validate()?;
        let env = IntersectionEnv::<S>::build(env_config)?;
        for entry in config.controllers.iter() {
            entry.controller.validate(env.intersection())?;
        }
        Ok(Self {
            config: config.clone(),
            env_config: env_config.clone(),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Runs all (controller, seed) pairs and aggregates the outcomes.
    pub fn run(&self) -> Result<EvaluationReport> {
        let jobs: Vec<(&ControllerEntry, u64)> = self
            .config
            .controllers
            .iter()
            .flat_map(|entry| self.config.seeds.iter().map(move |&seed| (entry, seed)))
            .collect();
        info!(
            "Evaluate {} controllers on {} seeds ({} runs, {} workers)",
            self.config.controllers.len(),
            self.config.seeds.len(),
            jobs.len(),
            self.config.n_workers
        );

        let pool = WorkerPool::new(self.config.n_workers);
        let outcomes = pool
            .run(jobs, |(entry, seed)| self.run_one(entry, seed))
            .map_err(|e| {
                warn!("Evaluation aborted: {}", e);
                e
            })?;

        let report = EvaluationReport::from_outcomes(&self.config, &outcomes);
        info!(
            "Evaluation done: {} summaries, {} comparisons, {} failed runs",
            report.summaries.len(),
            report.comparisons.len(),
            report.failed_runs.len()
        );
        Ok(report)
    }

    /// Trains (if learned) and evaluates one controller on one seed.
    pub fn run_one(&self, entry: &ControllerEntry, seed: u64) -> Result<RunOutcome> {
        let run_seed = RunSeed::new(seed);
        let mut runner = EpisodeRunner::<IntersectionEnv<S>>::build(&self.env_config)?;
        let layout = runner.env().intersection().clone();
        let mut controller = Controller::build(&entry.controller, &layout, run_seed)?;
        let horizon = self.config.horizon;

        let mut training_curve = vec![];
        if controller.is_learned() {
            controller.set_train::<S>(true);
            for k in 0..self.config.train_episodes {
                let env_seed = run_seed.derive(SeedStream::Training(k as u64));
                let log = runner.run(&mut controller, env_seed, horizon)?;
                if !log.status().is_completed() {
                    warn!(
                        "{} (seed {}): training episode {} {}",
                        entry.id,
                        seed,
                        k,
                        log.status().name()
                    );
                }
                training_curve.push(log.summary().mean_queue_length);
            }
            controller.set_train::<S>(false);
        }

        let env_seed = run_seed.derive(SeedStream::Environment);
        let log = runner.run(&mut controller, env_seed, horizon)?;
        match log.status() {
            EpisodeStatus::Completed => info!(
                "{} (seed {}): mean queue length {:.3}, throughput {}",
                entry.id,
                seed,
                log.summary().mean_queue_length,
                log.summary().throughput
            ),
            status => warn!(
                "{} (seed {}): evaluation episode {}: {}",
                entry.id,
                seed,
                status.name(),
                status.reason().unwrap_or_default()
            ),
        }

        Ok(RunOutcome {
            controller_id: entry.id.clone(),
            seed,
            status: log.status().clone(),
            summary: *log.summary(),
            training_curve,
        })
    }
}
