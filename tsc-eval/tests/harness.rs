use anyhow::Result;
use tsc_agent::{DqnConfig, MlpQConfig, TabularQAgentConfig};
use tsc_baselines::{FixedCycleConfig, MaxPressureConfig};
use tsc_core::{runner::Metric, TscError};
use tsc_env::{
    Demand, IntersectionEnvConfig, IntersectionLayout, SimSnapshot, Simulator, SimulatorError,
    SyntheticConfig, SyntheticIntersection,
};
use tsc_eval::{
    ControllerConfig, EvaluationConfig, EvaluationHarness, EvaluationReport, QualityFlag,
    SignificanceTest,
};

fn env_config(rates: &[f64]) -> IntersectionEnvConfig<SyntheticConfig> {
    IntersectionEnvConfig::default()
        .max_steps(60)
        .simulator(SyntheticConfig::default().arrival_rates(rates))
}

fn fc_vs_mp() -> EvaluationConfig {
    EvaluationConfig::default()
        .controllers(vec![])
        .controller(
            "fixed-cycle",
            ControllerConfig::FixedCycle(FixedCycleConfig::default().durations(vec![15, 15])),
        )
        .controller(
            "max-pressure",
            ControllerConfig::MaxPressure(MaxPressureConfig::default()),
        )
        .learned_id("max-pressure")
        .seeds((0..5).collect())
        .n_workers(2)
}

fn run(
    config: &EvaluationConfig,
    env_config: &IntersectionEnvConfig<SyntheticConfig>,
) -> Result<EvaluationReport> {
    EvaluationHarness::<SyntheticIntersection>::build(config, env_config)?.run()
}

#[test]
fn test_single_seed_is_rejected() {
    let config = fc_vs_mp().seeds(vec![7]);
    let err = EvaluationHarness::<SyntheticIntersection>::build(&config, &env_config(&[0.5, 0.5]))
        .err()
        .expect("a single seed must be rejected");
    assert_eq!(
        err.downcast_ref::<TscError>(),
        Some(&TscError::InsufficientSeeds(1))
    );
}

#[test]
fn test_invalid_controller_fails_before_running() {
    let config = fc_vs_mp().controller(
        "short-cycle",
        ControllerConfig::FixedCycle(FixedCycleConfig::default().durations(vec![5])),
    );
    let err = EvaluationHarness::<SyntheticIntersection>::build(&config, &env_config(&[0.5, 0.5]))
        .err()
        .expect("durations do not match the phases");
    assert!(matches!(
        err.downcast_ref::<TscError>(),
        Some(TscError::InvalidConfig(_))
    ));
}

#[test]
fn test_fixed_cycle_vs_max_pressure() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let report = run(&fc_vs_mp(), &env_config(&[0.7, 0.1]))?;

    let fc = report
        .summary("fixed-cycle", Metric::MeanQueueLength)
        .expect("summary of fixed-cycle");
    let mp = report
        .summary("max-pressure", Metric::MeanQueueLength)
        .expect("summary of max-pressure");
    assert_eq!(fc.n_seeds, 5);
    assert_eq!(mp.n_seeds, 5);
    assert!(mp.mean <= fc.mean, "max pressure {} fixed cycle {}", mp.mean, fc.mean);
    assert!(fc.ci_low <= fc.mean && fc.mean <= fc.ci_high);

    let c = report
        .comparison("fixed-cycle", Metric::MeanQueueLength)
        .expect("paired comparison");
    assert_eq!(c.learned_id, "max-pressure");
    assert_eq!(c.n_pairs, 5);
    assert_eq!(c.test_name, "paired-t");
    assert!(c.mean_difference <= 0.0);
    assert!((c.mean_difference - (mp.mean - fc.mean)).abs() < 1e-9);
    assert!(c.p_value.is_some());

    assert_eq!(report.summaries.len(), 2 * Metric::ALL.len());
    assert_eq!(report.comparisons.len(), Metric::ALL.len());
    assert!(report.failed_runs.is_empty());
    assert!(report.training_curves.is_empty());
    Ok(())
}

#[test]
fn test_max_pressure_beats_fixed_cycle_on_periodic_demand() -> Result<()> {
    // one vehicle per step from the north-south, one every four steps from the east-west
    let env_config = IntersectionEnvConfig::default().max_steps(60).simulator(
        SyntheticConfig::default().demand(Demand::Periodic {
            periods: vec![1, 4],
        }),
    );
    let config = fc_vs_mp().metrics(vec![Metric::MeanQueueLength]);
    let report = run(&config, &env_config)?;

    let fc = report
        .summary("fixed-cycle", Metric::MeanQueueLength)
        .expect("summary of fixed-cycle");
    let mp = report
        .summary("max-pressure", Metric::MeanQueueLength)
        .expect("summary of max-pressure");
    assert_eq!(fc.n_seeds, 5);
    assert_eq!(mp.n_seeds, fc.n_seeds);
    assert!(mp.mean < fc.mean, "max pressure {} fixed cycle {}", mp.mean, fc.mean);

    // arrivals do not depend on the seed
    assert!(fc.std_dev < 1e-9);
    assert!(mp.std_dev < 1e-9);

    let c = report
        .comparison("fixed-cycle", Metric::MeanQueueLength)
        .expect("paired comparison");
    assert_eq!(c.n_pairs, 5);
    assert!(c.mean_difference < 0.0);
    assert!(report.failed_runs.is_empty());
    Ok(())
}

#[test]
fn test_wilcoxon_comparison() -> Result<()> {
    let config = fc_vs_mp()
        .test(SignificanceTest::Wilcoxon)
        .metrics(vec![Metric::MeanQueueLength]);
    let report = run(&config, &env_config(&[0.7, 0.1]))?;
    let c = report
        .comparison("fixed-cycle", Metric::MeanQueueLength)
        .expect("paired comparison");
    assert_eq!(c.test_name, "wilcoxon");
    assert!(c.flags.contains(&QualityFlag::LowPower));
    assert_eq!(report.summaries.len(), 2);
    Ok(())
}

#[test]
fn test_ci_shrinks_with_more_seeds() -> Result<()> {
    let width = |n_seeds: u64| -> Result<f64> {
        let config = fc_vs_mp()
            .learned_id("fixed-cycle")
            .seeds((0..n_seeds).collect())
            .n_workers(4);
        let report = run(&config, &env_config(&[0.5, 0.5]))?;
        let s = report
            .summary("fixed-cycle", Metric::MeanQueueLength)
            .expect("summary");
        assert_eq!(s.n_seeds as u64, n_seeds);
        Ok(s.ci_high - s.ci_low)
    };
    assert!(width(48)? < width(6)?);
    Ok(())
}

#[test]
fn test_results_do_not_depend_on_workers() -> Result<()> {
    let config = EvaluationConfig::default()
        .controllers(vec![])
        .controller(
            "tabular-q",
            ControllerConfig::TabularQ(TabularQAgentConfig::default()),
        )
        .controller(
            "fixed-cycle",
            ControllerConfig::FixedCycle(FixedCycleConfig::default()),
        )
        .learned_id("tabular-q")
        .seeds(vec![1, 2, 3, 4])
        .train_episodes(3);
    let env_config = env_config(&[0.5, 0.3]);

    let one = run(&config.clone().n_workers(1), &env_config)?;
    let three = run(&config.n_workers(3), &env_config)?;
    assert_eq!(one.summaries, three.summaries);
    assert_eq!(one.comparisons, three.comparisons);
    assert_eq!(one.training_curves, three.training_curves);
    assert_eq!(one.training_curves.len(), 4);
    assert!(one.training_curves.iter().all(|c| c.mean_queue_length.len() == 3));
    Ok(())
}

#[test]
fn test_dqn_is_trained_then_evaluated() -> Result<()> {
    let dqn = DqnConfig::default()
        .model(MlpQConfig::default().units(vec![16]))
        .replay_capacity(500)
        .batch_size(16)
        .min_transitions_warmup(16)
        .sync_interval(10);
    let config = EvaluationConfig::default()
        .controllers(vec![])
        .controller("dqn", ControllerConfig::Dqn(dqn))
        .controller(
            "max-pressure",
            ControllerConfig::MaxPressure(MaxPressureConfig::default()),
        )
        .seeds(vec![0, 1])
        .train_episodes(2)
        .horizon(30);
    let report = run(&config, &env_config(&[0.5, 0.5]))?;

    assert_eq!(report.training_curves.len(), 2);
    for curve in report.training_curves.iter() {
        assert_eq!(curve.controller_id, "dqn");
        assert_eq!(curve.mean_queue_length.len(), 2);
    }
    let s = report.summary("dqn", Metric::Throughput).expect("summary");
    assert_eq!(s.n_seeds + report.failed_runs.len(), 2);
    Ok(())
}

#[test]
fn test_truncated_runs_are_excluded() -> Result<()> {
    let env_config = IntersectionEnvConfig::default()
        .max_steps(60)
        .simulator(SyntheticConfig::default().fault_at_step(5, 2));
    let config = fc_vs_mp().seeds(vec![0, 1, 2]);
    let report = run(&config, &env_config)?;

    assert_eq!(report.failed_runs.len(), 6);
    assert!(report.failed_runs.iter().all(|f| f.status == "truncated"));
    let s = report
        .summary("fixed-cycle", Metric::MeanQueueLength)
        .expect("summary");
    assert_eq!(s.n_seeds, 0);
    assert!(s.flags.contains(&QualityFlag::InsufficientSamples));
    assert!(s.flags.contains(&QualityFlag::FailedRunsExcluded));
    let c = report
        .comparison("fixed-cycle", Metric::MeanQueueLength)
        .expect("comparison");
    assert_eq!(c.n_pairs, 0);
    assert_eq!(c.p_value, None);
    Ok(())
}

struct Offline {
    layout: IntersectionLayout,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
struct OfflineConfig;

impl Simulator for Offline {
    type Config = OfflineConfig;

    fn build(_config: &Self::Config) -> Result<Self, SimulatorError> {
        Ok(Self {
            layout: IntersectionLayout::two_way(),
        })
    }

    fn layout(&self) -> &IntersectionLayout {
        &self.layout
    }

    fn reset(&mut self, _seed: u64) -> Result<SimSnapshot, SimulatorError> {
        Err(SimulatorError::Unavailable("simulator offline".to_string()))
    }

    fn step(&mut self, _phase: usize) -> Result<SimSnapshot, SimulatorError> {
        Err(SimulatorError::Unavailable("simulator offline".to_string()))
    }
}

#[test]
fn test_unavailable_simulator_aborts_evaluation() -> Result<()> {
    let env_config = IntersectionEnvConfig::default().simulator(OfflineConfig);
    let harness = EvaluationHarness::<Offline>::build(&fc_vs_mp(), &env_config)?;
    let err = harness.run().err().expect("evaluation must abort");
    assert!(matches!(
        err.downcast_ref::<TscError>(),
        Some(TscError::SimulatorUnavailable(_))
    ));
    Ok(())
}

#[test]
fn test_config_and_report_files() -> Result<()> {
    let dir = tempdir::TempDir::new("tsc_eval")?;

    let config = EvaluationConfig::default()
        .test(SignificanceTest::Wilcoxon)
        .seeds(vec![11, 12, 13])
        .confidence(0.9);
    let path = dir.path().join("evaluation.yaml");
    config.save(&path)?;
    assert_eq!(EvaluationConfig::load(&path)?, config);

    let report = run(&fc_vs_mp().seeds(vec![0, 1, 2]), &env_config(&[0.5, 0.5]))?;
    let path = dir.path().join("report.json");
    report.save_json(&path)?;
    assert_eq!(EvaluationReport::load_json(&path)?, report);
    let path = dir.path().join("report.yaml");
    report.save_yaml(&path)?;
    assert_eq!(EvaluationReport::load_yaml(&path)?.summaries, report.summaries);
    Ok(())
}
