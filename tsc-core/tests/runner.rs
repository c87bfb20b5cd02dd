use anyhow::Result;
use tsc_core::{
    record::{BufferedRecorder, Record, RecordValue},
    runner::{EpisodeRunner, EpisodeStatus},
    Act, Env, FeatureLayout, Obs, Policy, Step, StepMetrics, Transition, TscError,
};

#[derive(Clone, Debug)]
struct CountObs(f32);

impl Obs for CountObs {
    fn features(&self) -> Vec<f32> {
        vec![self.0, 1.0, 0.0]
    }
}

#[derive(Clone, Debug, PartialEq)]
struct CountAct(usize);

impl Act for CountAct {
    fn index(&self) -> usize {
        self.0
    }

    fn from_index(ix: usize) -> Self {
        Self(ix)
    }
}

#[derive(Clone, Default)]
struct CountEnvConfig {
    max_steps: usize,
    malformed_at: Option<usize>,
    fault_at: Option<usize>,
    unavailable: bool,
    malformed_reset: bool,
}

struct CountEnv {
    config: CountEnvConfig,
    t: usize,
    seed: u64,
}

impl Env for CountEnv {
    type Config = CountEnvConfig;
    type Obs = CountObs;
    type Act = CountAct;
    type Info = ();

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            t: 0,
            seed: 0,
        })
    }

    fn reset(&mut self, seed: u64) -> Result<CountObs> {
        if self.config.unavailable {
            return Err(TscError::SimulatorUnavailable("down".to_string()).into());
        }
        if self.config.malformed_reset {
            return Err(TscError::MalformedState("queue is NaN".to_string()).into());
        }
        self.t = 0;
        self.seed = seed;
        Ok(CountObs(0.0))
    }

    fn step(&mut self, a: &CountAct) -> Result<(Step<Self>, Record)> {
        if self.config.malformed_at == Some(self.t) {
            return Err(TscError::MalformedState("negative queue".to_string()).into());
        }
        let mut record = Record::empty();
        let is_truncated = self.config.fault_at == Some(self.t);
        if is_truncated {
            record.insert("fault", RecordValue::String("lost connection".to_string()));
        }
        self.t += 1;
        let is_terminated = !is_truncated && self.t >= self.config.max_steps;
        let queue = (self.seed as usize + self.t) as f32;
        let metrics = StepMetrics {
            total_queue: queue,
            mean_waiting: 0.0,
            departed: a.0 as f32,
        };
        let step = Step::new(
            CountObs(self.t as f32),
            a.clone(),
            -queue,
            is_terminated,
            is_truncated,
            metrics,
            (),
        );
        Ok((step, record))
    }

    fn n_actions(&self) -> usize {
        2
    }

    fn layout(&self) -> FeatureLayout {
        FeatureLayout::new(1, 1)
    }
}

#[derive(Default)]
struct Alternate {
    n_observed: usize,
    n_resets: usize,
}

impl Policy<CountEnv> for Alternate {
    fn act(&mut self, obs: &CountObs) -> Result<CountAct> {
        Ok(CountAct(obs.0 as usize % 2))
    }

    fn observe(&mut self, _transition: &Transition) -> Result<Option<Record>> {
        self.n_observed += 1;
        Ok(Some(Record::from_scalar("loss", 0.5)))
    }

    fn reset_episode(&mut self) {
        self.n_resets += 1;
    }
}

fn config(max_steps: usize) -> CountEnvConfig {
    CountEnvConfig {
        max_steps,
        ..Default::default()
    }
}

#[test]
fn test_episode_ends_at_step_budget() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&config(5))?;
    let mut policy = Alternate::default();
    let log = runner.run(&mut policy, 0, 100)?;

    assert_eq!(log.status(), &EpisodeStatus::Completed);
    assert_eq!(log.len(), 5);
    assert_eq!(policy.n_observed, 5);
    assert_eq!(policy.n_resets, 1);
    assert!(log.transitions()[4].is_terminated());
    assert!(log.transitions()[..4].iter().all(|t| !t.is_done()));
    assert_eq!(log.summary().mean_queue_length, 3.0);
    assert_eq!(log.summary().throughput, 2.0);
    Ok(())
}

#[test]
fn test_horizon_limits_episode() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&config(50))?;
    let log = runner.run(&mut Alternate::default(), 0, 7)?;
    assert_eq!(log.len(), 7);
    assert!(log.status().is_completed());
    Ok(())
}

#[test]
fn test_episode_is_deterministic_and_ids_increase() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&config(10))?;
    let a = runner.run(&mut Alternate::default(), 4, 100)?;
    let b = runner.run(&mut Alternate::default(), 4, 100)?;
    assert_eq!(a.transitions(), b.transitions());
    assert_eq!(a.summary(), b.summary());
    assert_eq!(a.episode_id() + 1, b.episode_id());

    let rows = b.trajectory();
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| r.episode_id == b.episode_id()));
    assert_eq!(rows[3].step_index, 3);
    assert!(rows[9].done_flag);
    Ok(())
}

#[test]
fn test_malformed_state_fails_episode_without_feeding_controller() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&CountEnvConfig {
        max_steps: 10,
        malformed_at: Some(3),
        ..Default::default()
    })?;
    let mut policy = Alternate::default();
    let log = runner.run(&mut policy, 0, 100)?;

    assert_eq!(log.status().name(), "failed");
    assert!(log.status().reason().unwrap().contains("negative queue"));
    assert_eq!(log.len(), 3);
    assert_eq!(policy.n_observed, 3);
    Ok(())
}

#[test]
fn test_fault_truncates_episode() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&CountEnvConfig {
        max_steps: 10,
        fault_at: Some(2),
        ..Default::default()
    })?;
    let mut policy = Alternate::default();
    let log = runner.run(&mut policy, 0, 100)?;

    assert_eq!(
        log.status(),
        &EpisodeStatus::Truncated {
            reason: "lost connection".to_string()
        }
    );
    // the faulted step is not part of the episode
    assert_eq!(log.len(), 2);
    assert_eq!(policy.n_observed, 2);
    assert!(log.transitions().iter().all(|t| !t.is_done()));
    assert_eq!(log.summary().steps, 2);
    Ok(())
}

#[test]
fn test_malformed_reset_fails_episode() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&CountEnvConfig {
        max_steps: 10,
        malformed_reset: true,
        ..Default::default()
    })?;
    let mut policy = Alternate::default();
    let log = runner.run(&mut policy, 0, 100)?;

    assert_eq!(log.status().name(), "failed");
    assert!(log.status().reason().unwrap().contains("queue is NaN"));
    assert!(log.is_empty());
    assert_eq!(log.summary().steps, 0);
    assert_eq!(policy.n_resets, 0);
    Ok(())
}

#[test]
fn test_unavailable_simulator_is_fatal() -> Result<()> {
    let mut runner = EpisodeRunner::<CountEnv>::build(&CountEnvConfig {
        max_steps: 10,
        unavailable: true,
        ..Default::default()
    })?;
    let err = runner.run(&mut Alternate::default(), 0, 100).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TscError>(),
        Some(TscError::SimulatorUnavailable(_))
    ));
    Ok(())
}

#[test]
fn test_records_are_tagged() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut runner = EpisodeRunner::<CountEnv>::build(&config(4))?;
    let mut recorder = BufferedRecorder::new();
    runner.run_with_recorder(&mut Alternate::default(), 0, 100, &mut recorder)?;

    // one record per step plus the episode summary
    assert_eq!(recorder.len(), 5);
    let records = recorder.drain();
    assert_eq!(records[2].get_scalar("step_index")?, 2.0);
    assert_eq!(records[2].get_scalar("loss")?, 0.5);
    assert_eq!(records[4].get_string("status")?, "completed");
    assert_eq!(records[4].get_scalar("episode_steps")?, 4.0);
    Ok(())
}

#[test]
fn test_trajectory_file() -> Result<()> {
    let dir = tempdir::TempDir::new("trajectory")?;
    let path = dir.path().join("episode.csv");
    let mut runner = EpisodeRunner::<CountEnv>::build(&config(3))?;
    runner.run(&mut Alternate::default(), 0, 100)?.save_trajectory(&path)?;
    let text = std::fs::read_to_string(&path)?;
    assert_eq!(text.lines().count(), 4);
    Ok(())
}
