//! Episode runner.
mod log;
pub use self::log::{EpisodeLog, EpisodeStatus, EpisodeSummary, Metric, TrajectoryRecord};
use crate::{
    error::classify,
    record::{NullRecorder, Record, RecordValue, Recorder},
    Env, Policy, Transition,
};
use ::log::{info, trace, warn};
use anyhow::Result;

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Drives a controller through episodes of an environment.
///
/// The runner is written once against [`Policy`], so learned and rule-based
/// controllers are invoked the same way:
///
/// ```mermaid
/// flowchart LR
///   A["Policy::act()"] --> B["Env::step()"]
///   B --> C["Policy::observe()"]
///   C --> D{done or horizon?}
///   D -- no --> A
///   D -- yes --> E[EpisodeLog]
/// ```
///
/// Failures are handled according to their kind. An error that only concerns the
/// current episode ([`TscError::is_episode_local`](crate::TscError::is_episode_local))
/// ends the episode with [`EpisodeStatus::Failed`]; the transition that caused it is
/// not handed to the controller. This includes a malformed state returned by
/// [`Env::reset`], which yields an empty failed log. A simulator fault reported by the
/// environment ends the episode with [`EpisodeStatus::Truncated`]; the truncated step
/// repeats the last valid one, so it is neither logged nor observed. Any other error is
/// returned to the caller.
///
/// An episode is deterministic given the controller state, the seed and the
/// environment configuration.
pub struct EpisodeRunner<E: Env> {
    env: E,
    next_episode_id: usize,
}

impl<E: Env> EpisodeRunner<E> {
    /// Creates a runner on an environment.
    pub fn new(env: E) -> Self {
        Self {
            env,
            next_episode_id: 0,
        }
    }

    /// Builds the environment and creates a runner on it.
    pub fn build(config: &E::Config) -> Result<Self> {
        Ok(Self::new(E::build(config)?))
    }

    /// The environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Runs one episode of at most `horizon` steps.
    pub fn run<P: Policy<E>>(
        &mut self,
        policy: &mut P,
        seed: u64,
        horizon: usize,
    ) -> Result<EpisodeLog> {
        self.run_with_recorder(policy, seed, horizon, &mut NullRecorder {})
    }

    /// Runs one episode and writes step and update records to `recorder`.
    ///
    /// Each record is tagged with `episode_id` and `step_index`.
    pub fn run_with_recorder<P, R>(
        &mut self,
        policy: &mut P,
        seed: u64,
        horizon: usize,
        recorder: &mut R,
    ) -> Result<EpisodeLog>
    where
        P: Policy<E>,
        R: Recorder + ?Sized,
    {
        let episode_id = self.next_episode_id;
        self.next_episode_id += 1;

        info!("Episode {} starts (seed = {}, horizon = {})", episode_id, seed, horizon);
        let mut log = EpisodeLog::new(episode_id, seed);
        let mut prev_obs = match self.env.reset(seed) {
            Ok(obs) => obs,
            Err(e) => {
                log.finish(episode_failure(e)?);
                warn!("Episode {} failed at reset", episode_id);
                recorder.write(episode_record(&log));
                return Ok(log);
            }
        };
        policy.reset_episode();

        let mut status = EpisodeStatus::Completed;

        for step_index in 0..horizon {
            let act = match policy.act(&prev_obs) {
                Ok(act) => act,
                Err(e) => {
                    status = episode_failure(e)?;
                    break;
                }
            };

            let (step, mut record) = match self.env.step(&act) {
                Ok(step) => step,
                Err(e) => {
                    status = episode_failure(e)?;
                    break;
                }
            };

            if step.is_truncated {
                let reason = record
                    .get_string("fault")
                    .unwrap_or_else(|_| "simulator fault".to_string());
                warn!("Episode {} truncated at step {}: {}", episode_id, step_index, reason);
                status = EpisodeStatus::Truncated { reason };
                break;
            }

            let transition = Transition::from_step(&prev_obs, &step);
            if !transition.is_finite() {
                warn!("Episode {}: non-finite transition at step {}", episode_id, step_index);
                status = EpisodeStatus::Failed {
                    reason: format!("non-finite transition at step {}", step_index),
                };
                break;
            }

            match policy.observe(&transition) {
                Ok(Some(update)) => record.merge_inplace(update),
                Ok(None) => {}
                Err(e) => {
                    log.push(transition, step.metrics);
                    status = episode_failure(e)?;
                    break;
                }
            }

            let is_done = step.is_done();
            log.push(transition, step.metrics);

            if !record.is_empty() {
                record.insert("episode_id", RecordValue::Scalar(episode_id as f32));
                record.insert("step_index", RecordValue::Scalar(step_index as f32));
                trace!("{:?}", record);
                recorder.write(record);
            }

            if is_done {
                break;
            }
            prev_obs = step.obs;
        }

        log.finish(status);
        info!(
            "Episode {} ends: {:?}, steps = {}, mean queue = {:.3}",
            episode_id,
            log.status(),
            log.summary().steps,
            log.summary().mean_queue_length
        );
        recorder.write(episode_record(&log));
        Ok(log)
    }
}

/// Turns an error raised within an episode into a failed status, or returns it if it
/// is fatal.
fn episode_failure(err: anyhow::Error) -> Result<EpisodeStatus> {
    match classify(&err) {
        Some(e) if e.is_episode_local() => {
            warn!("Episode failed: {}", e);
            Ok(EpisodeStatus::Failed {
                reason: e.to_string(),
            })
        }
        _ => Err(err),
    }
}

fn episode_record(log: &EpisodeLog) -> Record {
    let summary = log.summary();
    let mut record = Record::from_slice(&[
        ("episode_id", RecordValue::Scalar(log.episode_id() as f32)),
        ("episode_steps", RecordValue::Scalar(summary.steps as f32)),
        ("total_reward", RecordValue::Scalar(summary.total_reward)),
    ]);
    for metric in Metric::ALL {
        record.insert(metric.name(), RecordValue::Scalar(summary.get(metric)));
    }
    record.insert("status", RecordValue::String(log.status().name().to_string()));
    record
}
