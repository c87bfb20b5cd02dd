//! Episode logs and the trajectory schema.
use crate::{StepMetrics, Transition};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path};

/// How an episode ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    /// The episode reached its step budget or horizon.
    Completed,

    /// The simulator faulted; the log holds the steps up to the last valid one.
    Truncated {
        /// Description of the fault.
        reason: String,
    },

    /// The episode was aborted, e.g. because of a malformed state.
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

impl EpisodeStatus {
    /// Returns `true` if the episode may contribute to statistics.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Short name of the status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Truncated { .. } => "truncated",
            Self::Failed { .. } => "failed",
        }
    }

    /// Reason of a truncation or failure.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Completed => None,
            Self::Truncated { reason } | Self::Failed { reason } => Some(reason),
        }
    }
}

/// Summary metrics of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Mean over steps of the total queue length.
    MeanQueueLength,

    /// Mean over steps of the mean waiting time per queued vehicle.
    MeanWaitingTime,

    /// Number of vehicles that left the intersection.
    Throughput,

    /// Sum of rewards.
    TotalReward,
}

impl Metric {
    /// All metrics.
    pub const ALL: [Metric; 4] = [
        Self::MeanQueueLength,
        Self::MeanWaitingTime,
        Self::Throughput,
        Self::TotalReward,
    ];

    /// Name used in records and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MeanQueueLength => "mean_queue_length",
            Self::MeanWaitingTime => "mean_waiting_time",
            Self::Throughput => "throughput",
            Self::TotalReward => "total_reward",
        }
    }
}

/// Per-episode summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Mean total queue length over steps.
    pub mean_queue_length: f32,

    /// Mean per-vehicle waiting time over steps.
    pub mean_waiting_time: f32,

    /// Total number of departed vehicles.
    pub throughput: f32,

    /// Sum of rewards.
    pub total_reward: f32,

    /// Number of steps.
    pub steps: usize,
}

impl EpisodeSummary {
    /// Value of a metric.
    pub fn get(&self, metric: Metric) -> f32 {
        match metric {
            Metric::MeanQueueLength => self.mean_queue_length,
            Metric::MeanWaitingTime => self.mean_waiting_time,
            Metric::Throughput => self.throughput,
            Metric::TotalReward => self.total_reward,
        }
    }

    fn from_steps(transitions: &[Transition], metrics: &[StepMetrics]) -> Self {
        let steps = metrics.len();
        if steps == 0 {
            return Self::default();
        }
        let n = steps as f32;
        Self {
            mean_queue_length: metrics.iter().map(|m| m.total_queue).sum::<f32>() / n,
            mean_waiting_time: metrics.iter().map(|m| m.mean_waiting).sum::<f32>() / n,
            throughput: metrics.iter().map(|m| m.departed).sum(),
            total_reward: transitions.iter().map(|t| t.reward()).sum(),
            steps,
        }
    }
}

/// One row of the trajectory log consumed by offline analysis tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    /// State before the action.
    pub state_vector: Vec<f32>,

    /// Index of the applied action.
    pub action_index: usize,

    /// Reward.
    pub reward: f32,

    /// State after the action.
    pub next_state_vector: Vec<f32>,

    /// The episode ended with this step.
    pub done_flag: bool,

    /// Episode identifier, unique within a runner.
    pub episode_id: usize,

    /// Position of the step in the episode.
    pub step_index: usize,
}

/// CSV row: vectors are written as space-separated values.
#[derive(Debug, Serialize)]
struct TrajectoryCsvRow {
    episode_id: usize,
    step_index: usize,
    state_vector: String,
    action_index: usize,
    reward: f32,
    next_state_vector: String,
    done_flag: bool,
}

fn join(v: &[f32]) -> String {
    v.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl From<&TrajectoryRecord> for TrajectoryCsvRow {
    fn from(r: &TrajectoryRecord) -> Self {
        Self {
            episode_id: r.episode_id,
            step_index: r.step_index,
            state_vector: join(&r.state_vector),
            action_index: r.action_index,
            reward: r.reward,
            next_state_vector: join(&r.next_state_vector),
            done_flag: r.done_flag,
        }
    }
}

/// Ordered transitions of an episode with its summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeLog {
    episode_id: usize,
    seed: u64,
    status: EpisodeStatus,
    transitions: Vec<Transition>,
    metrics: Vec<StepMetrics>,
    summary: EpisodeSummary,
}

impl EpisodeLog {
    pub(super) fn new(episode_id: usize, seed: u64) -> Self {
        Self {
            episode_id,
            seed,
            status: EpisodeStatus::Completed,
            transitions: vec![],
            metrics: vec![],
            summary: EpisodeSummary::default(),
        }
    }

    pub(super) fn push(&mut self, transition: Transition, metrics: StepMetrics) {
        self.transitions.push(transition);
        self.metrics.push(metrics);
    }

    pub(super) fn finish(&mut self, status: EpisodeStatus) {
        self.status = status;
        self.summary = EpisodeSummary::from_steps(&self.transitions, &self.metrics);
    }

    /// Episode identifier.
    pub fn episode_id(&self) -> usize {
        self.episode_id
    }

    /// Seed the environment was reset with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// How the episode ended.
    pub fn status(&self) -> &EpisodeStatus {
        &self.status
    }

    /// Transitions in order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Per-step traffic measurements, aligned with [`EpisodeLog::transitions`].
    pub fn step_metrics(&self) -> &[StepMetrics] {
        &self.metrics
    }

    /// Summary metrics.
    pub fn summary(&self) -> &EpisodeSummary {
        &self.summary
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if no step was taken.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Rows of the trajectory log.
    pub fn trajectory(&self) -> Vec<TrajectoryRecord> {
        self.transitions
            .iter()
            .enumerate()
            .map(|(step_index, t)| TrajectoryRecord {
                state_vector: t.obs().to_vec(),
                action_index: t.act(),
                reward: t.reward(),
                next_state_vector: t.next_obs().to_vec(),
                done_flag: t.is_done(),
                episode_id: self.episode_id,
                step_index,
            })
            .collect()
    }

    /// Writes the trajectory as CSV with a header row.
    pub fn write_trajectory<W: Write>(&self, wtr: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(wtr);
        for r in self.trajectory().iter() {
            wtr.serialize(TrajectoryCsvRow::from(r))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the trajectory to a CSV file.
    pub fn save_trajectory(&self, path: impl AsRef<Path>) -> Result<()> {
        self.write_trajectory(File::create(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> EpisodeLog {
        let mut log = EpisodeLog::new(3, 11);
        log.push(
            Transition::new(vec![1.0, 0.0], 0, -1.0, vec![2.0, 0.0], false, false),
            StepMetrics {
                total_queue: 2.0,
                mean_waiting: 1.0,
                departed: 1.0,
            },
        );
        log.push(
            Transition::new(vec![2.0, 0.0], 1, -3.0, vec![0.0, 1.0], true, false),
            StepMetrics {
                total_queue: 4.0,
                mean_waiting: 3.0,
                departed: 2.0,
            },
        );
        log.finish(EpisodeStatus::Completed);
        log
    }

    #[test]
    fn test_summary() {
        let s = *log().summary();
        assert_eq!(s.steps, 2);
        assert_eq!(s.mean_queue_length, 3.0);
        assert_eq!(s.mean_waiting_time, 2.0);
        assert_eq!(s.throughput, 3.0);
        assert_eq!(s.total_reward, -4.0);
        assert_eq!(s.get(Metric::TotalReward), -4.0);
    }

    #[test]
    fn test_trajectory_csv() -> Result<()> {
        let mut buf = vec![];
        log().write_trajectory(&mut buf)?;
        let text = String::from_utf8(buf)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "episode_id,step_index,state_vector,action_index,reward,next_state_vector,done_flag"
        );
        assert_eq!(lines[2], "3,1,2 0,1,-3.0,0 1,true");
        Ok(())
    }
}
