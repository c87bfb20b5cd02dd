//! Evaluation report.
use crate::{
    stats::{self, confidence_interval, paired_t_test, wilcoxon_signed_rank},
    EvaluationConfig, RunOutcome, SignificanceTest,
};
use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tsc_core::runner::Metric;

/// Issues that limit the interpretation of a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    /// Fewer than two values; no interval or p-value.
    InsufficientSamples,

    /// All values (or differences) are equal.
    DegenerateVariance,

    /// Truncated or failed runs were left out.
    FailedRunsExcluded,

    /// Some seeds have a completed run on one side of the pair only.
    UnmatchedSeeds,

    /// Wilcoxon test with fewer than 6 non-zero differences: the smallest attainable
    /// two-sided p-value is above 0.05.
    LowPower,
}

/// Statistics of one metric of one controller across seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Controller id.
    pub controller_id: String,

    /// Metric name.
    pub metric_name: String,

    /// Mean over completed runs.
    pub mean: f64,

    /// Sample standard deviation.
    pub std_dev: f64,

    /// Lower bound of the confidence interval of the mean.
    pub ci_low: f64,

    /// Upper bound of the confidence interval of the mean.
    pub ci_high: f64,

    /// Number of completed runs.
    pub n_seeds: usize,

    /// Quality flags.
    pub flags: Vec<QualityFlag>,
}

/// Paired comparison of the learned controller against a baseline on matched seeds.
///
/// Differences are `learned - baseline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedComparison {
    /// Id of the learned controller.
    pub learned_id: String,

    /// Id of the baseline.
    pub baseline_id: String,

    /// Metric name.
    pub metric_name: String,

    /// Mean difference.
    pub mean_difference: f64,

    /// Lower bound of the confidence interval of the mean difference.
    pub ci_low: f64,

    /// Upper bound of the confidence interval of the mean difference.
    pub ci_high: f64,

    /// Two-sided p-value, `None` for fewer than two pairs.
    pub p_value: Option<f64>,

    /// Name of the test.
    pub test_name: String,

    /// Number of seeds where both runs completed.
    pub n_pairs: usize,

    /// Quality flags.
    pub flags: Vec<QualityFlag>,
}

/// A run excluded from the statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRun {
    /// Controller id.
    pub controller_id: String,

    /// Seed.
    pub seed: u64,

    /// `truncated` or `failed`.
    pub status: String,

    /// Cause.
    pub reason: String,
}

/// Mean queue length of the training episodes of a learned controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCurve {
    /// Controller id.
    pub controller_id: String,

    /// Seed.
    pub seed: u64,

    /// Mean queue length of each training episode.
    pub mean_queue_length: Vec<f32>,
}

/// Result of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Creation time.
    pub created_at: DateTime<Local>,

    /// Name of the paired test.
    pub test: String,

    /// Level of the confidence intervals.
    pub confidence: f64,

    /// Per-controller, per-metric statistics.
    pub summaries: Vec<MetricSummary>,

    /// Learned controller against each baseline, per metric.
    pub comparisons: Vec<PairedComparison>,

    /// Runs excluded from the statistics.
    pub failed_runs: Vec<FailedRun>,

    /// Training curves of learned controllers.
    pub training_curves: Vec<TrainingCurve>,
}

fn summarize(controller_id: &str, metric: Metric, values: &[f64], confidence: f64) -> MetricSummary {
    let mut flags = vec![];
    let mean = stats::mean(values);
    let std_dev = stats::std_dev(values);
    let (ci_low, ci_high) = match confidence_interval(values, confidence) {
        Some(ci) => ci,
        None => {
            flags.push(QualityFlag::InsufficientSamples);
            (mean, mean)
        }
    };
    if values.len() >= 2 && std_dev == 0.0 {
        flags.push(QualityFlag::DegenerateVariance);
    }
    MetricSummary {
        controller_id: controller_id.to_string(),
        metric_name: metric.name().to_string(),
        mean,
        std_dev,
        ci_low,
        ci_high,
        n_seeds: values.len(),
        flags,
    }
}

fn compare(
    learned_id: &str,
    baseline_id: &str,
    metric: Metric,
    diffs: &[f64],
    test: SignificanceTest,
    confidence: f64,
) -> PairedComparison {
    let mut flags = vec![];
    let mean_difference = stats::mean(diffs);
    let (ci_low, ci_high) = confidence_interval(diffs, confidence)
        .unwrap_or((mean_difference, mean_difference));

    let p_value = if diffs.len() < 2 {
        flags.push(QualityFlag::InsufficientSamples);
        None
    } else {
        if stats::std_dev(diffs) == 0.0 {
            flags.push(QualityFlag::DegenerateVariance);
        }
        match test {
            SignificanceTest::PairedT => paired_t_test(diffs).map(|r| r.p_value),
            SignificanceTest::Wilcoxon => {
                let r = wilcoxon_signed_rank(diffs);
                if r.n_nonzero < 6 {
                    flags.push(QualityFlag::LowPower);
                }
                Some(r.p_value)
            }
        }
    };

    PairedComparison {
        learned_id: learned_id.to_string(),
        baseline_id: baseline_id.to_string(),
        metric_name: metric.name().to_string(),
        mean_difference,
        ci_low,
        ci_high,
        p_value,
        test_name: test.name().to_string(),
        n_pairs: diffs.len(),
        flags,
    }
}

impl EvaluationReport {
    /// Aggregates the outcomes of all (controller, seed) runs.
    ///
    /// Only completed runs enter the statistics.
    pub fn from_outcomes(config: &EvaluationConfig, outcomes: &[RunOutcome]) -> Self {
        let completed: HashMap<(String, u64), &RunOutcome> = outcomes
            .iter()
            .filter(|o| o.status.is_completed())
            .map(|o| ((o.controller_id.clone(), o.seed), o))
            .collect();
        let failed_runs: Vec<FailedRun> = outcomes
            .iter()
            .filter(|o| !o.status.is_completed())
            .map(|o| FailedRun {
                controller_id: o.controller_id.clone(),
                seed: o.seed,
                status: o.status.name().to_string(),
                reason: o.status.reason().unwrap_or_default().to_string(),
            })
            .collect();
        let has_failures = |id: &str| failed_runs.iter().any(|f| f.controller_id == id);
        let value = |id: &str, seed: u64, metric: Metric| {
            completed
                .get(&(id.to_string(), seed))
                .map(|o| o.summary.get(metric) as f64)
        };

        let mut summaries = vec![];
        for entry in config.controllers.iter() {
            for &metric in config.metrics.iter() {
                let values: Vec<f64> = config
                    .seeds
                    .iter()
                    .filter_map(|&seed| value(&entry.id, seed, metric))
                    .collect();
                let mut s = summarize(&entry.id, metric, &values, config.confidence);
                if has_failures(&entry.id) {
                    s.flags.push(QualityFlag::FailedRunsExcluded);
                }
                summaries.push(s);
            }
        }

        let learned = config.learned_id.as_str();
        let mut comparisons = vec![];
        for entry in config.controllers.iter().filter(|e| e.id != learned) {
            for &metric in config.metrics.iter() {
                let mut unmatched = false;
                let mut diffs = vec![];
                for &seed in config.seeds.iter() {
                    match (value(learned, seed, metric), value(&entry.id, seed, metric)) {
                        (Some(a), Some(b)) => diffs.push(a - b),
                        (None, None) => {}
                        _ => unmatched = true,
                    }
                }
                let mut c = compare(learned, &entry.id, metric, &diffs, config.test, config.confidence);
                if has_failures(learned) || has_failures(&entry.id) {
                    c.flags.push(QualityFlag::FailedRunsExcluded);
                }
                if unmatched {
                    c.flags.push(QualityFlag::UnmatchedSeeds);
                }
                comparisons.push(c);
            }
        }

        let training_curves = outcomes
            .iter()
            .filter(|o| !o.training_curve.is_empty())
            .map(|o| TrainingCurve {
                controller_id: o.controller_id.clone(),
                seed: o.seed,
                mean_queue_length: o.training_curve.clone(),
            })
            .collect();

        Self {
            created_at: Local::now(),
            test: config.test.name().to_string(),
            confidence: config.confidence,
            summaries,
            comparisons,
            failed_runs,
            training_curves,
        }
    }

    /// Summary of a metric of a controller.
    pub fn summary(&self, controller_id: &str, metric: Metric) -> Option<&MetricSummary> {
        self.summaries
            .iter()
            .find(|s| s.controller_id == controller_id && s.metric_name == metric.name())
    }

    /// Comparison of the learned controller against a baseline on a metric.
    pub fn comparison(&self, baseline_id: &str, metric: Metric) -> Option<&PairedComparison> {
        self.comparisons
            .iter()
            .find(|c| c.baseline_id == baseline_id && c.metric_name == metric.name())
    }

    /// Saves the report as JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut wtr = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut wtr, self)?;
        wtr.flush()?;
        Ok(())
    }

    /// Loads a report from JSON.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(rdr)?)
    }

    /// Saves the report as YAML.
    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Loads a report from YAML.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_yaml::from_reader(rdr)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_flags() {
        let s = summarize("fc", Metric::Throughput, &[3.0], 0.95);
        assert_eq!(s.flags, vec![QualityFlag::InsufficientSamples]);
        assert_eq!((s.ci_low, s.ci_high), (3.0, 3.0));

        let s = summarize("fc", Metric::Throughput, &[3.0, 3.0, 3.0], 0.95);
        assert_eq!(s.flags, vec![QualityFlag::DegenerateVariance]);

        let s = summarize("fc", Metric::Throughput, &[1.0, 2.0, 3.0], 0.95);
        assert!(s.flags.is_empty());
        assert!(s.ci_low < 2.0 && s.ci_high > 2.0);
    }

    #[test]
    fn test_compare_flags() {
        let diffs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let c = compare("dqn", "fc", Metric::Throughput, &diffs, SignificanceTest::Wilcoxon, 0.95);
        assert_eq!(c.flags, vec![QualityFlag::LowPower]);
        assert!((c.p_value.unwrap() - 0.0625).abs() < 1e-12);
        assert_eq!(c.test_name, "wilcoxon");

        let c = compare("dqn", "fc", Metric::Throughput, &diffs, SignificanceTest::PairedT, 0.95);
        assert!(c.flags.is_empty());
        assert!((c.mean_difference - 3.0).abs() < 1e-12);

        let c = compare("dqn", "fc", Metric::Throughput, &[1.0], SignificanceTest::PairedT, 0.95);
        assert_eq!(c.p_value, None);
        assert_eq!(c.flags, vec![QualityFlag::InsufficientSamples]);
    }

    #[test]
    fn test_json_keeps_exact_values() -> anyhow::Result<()> {
        let values = [0.1 + 0.2, 1.0 / 3.0, 2.2250738585072014e-308, 7.000000000000001];
        let s = summarize("fc", Metric::MeanQueueLength, &values, 0.95);
        let text = serde_json::to_string(&s)?;
        let loaded: MetricSummary = serde_json::from_str(&text)?;
        assert_eq!(loaded, s);
        Ok(())
    }
}
