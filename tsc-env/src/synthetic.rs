//! A queue-based intersection simulator.
use crate::{IntersectionLayout, SimSnapshot, Simulator, SimulatorError};
use anyhow::Result;
use log::trace;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tsc_core::TscError;

/// Vehicle arrivals per incoming approach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Demand {
    /// At each step a vehicle arrives at approach `i` with probability `rates[i]`.
    Bernoulli {
        /// Arrival probabilities.
        rates: Vec<f64>,
    },

    /// A vehicle arrives at approach `i` every `periods[i]` steps, starting at
    /// step 0. A period of 0 means no arrival.
    Periodic {
        /// Arrival periods.
        periods: Vec<usize>,
    },
}

impl Demand {
    fn len(&self) -> usize {
        match self {
            Self::Bernoulli { rates } => rates.len(),
            Self::Periodic { periods } => periods.len(),
        }
    }
}

/// Configuration of [`SyntheticIntersection`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SyntheticConfig {
    /// Geometry.
    pub layout: IntersectionLayout,

    /// Arrivals.
    pub demand: Demand,

    /// Vehicles that can leave a green approach per step.
    pub depart_rate: usize,

    /// Vehicles that can leave an outgoing link per step.
    pub exit_rate: usize,

    /// Queue length at which a detector reports full occupancy.
    pub detector_capacity: f32,

    /// Time at which the simulator signals a fault, for testing fault handling.
    pub fault_at_step: Option<usize>,

    /// Number of consecutive failing calls at `fault_at_step`.
    pub fault_repeats: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            layout: IntersectionLayout::two_way(),
            demand: Demand::Bernoulli {
                rates: vec![0.5, 0.5],
            },
            depart_rate: 2,
            exit_rate: 2,
            detector_capacity: 10.0,
            fault_at_step: None,
            fault_repeats: 2,
        }
    }
}

impl SyntheticConfig {
    /// Sets the layout.
    pub fn layout(mut self, v: IntersectionLayout) -> Self {
        self.layout = v;
        self
    }

    /// Sets the demand.
    pub fn demand(mut self, v: Demand) -> Self {
        self.demand = v;
        self
    }

    /// Sets Bernoulli demand with the given arrival probabilities.
    pub fn arrival_rates(self, rates: &[f64]) -> Self {
        self.demand(Demand::Bernoulli {
            rates: rates.to_vec(),
        })
    }

    /// Sets the departure capacity of a green approach.
    pub fn depart_rate(mut self, v: usize) -> Self {
        self.depart_rate = v;
        self
    }

    /// Sets the exit capacity of an outgoing link.
    pub fn exit_rate(mut self, v: usize) -> Self {
        self.exit_rate = v;
        self
    }

    /// Sets the detector capacity.
    pub fn detector_capacity(mut self, v: f32) -> Self {
        self.detector_capacity = v;
        self
    }

    /// Makes the simulator fault `repeats` times at the given time.
    pub fn fault_at_step(mut self, t: usize, repeats: usize) -> Self {
        self.fault_at_step = Some(t);
        self.fault_repeats = repeats;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        let invalid = |msg: String| -> Result<()> { Err(TscError::InvalidConfig(msg).into()) };
        if self.demand.len() != self.layout.n_approaches() {
            return invalid(format!(
                "demand has {} entries for {} approaches",
                self.demand.len(),
                self.layout.n_approaches()
            ));
        }
        if let Demand::Bernoulli { rates } = &self.demand {
            if rates.iter().any(|r| !(0.0..=1.0).contains(r)) {
                return invalid("arrival rates must be in [0, 1]".to_string());
            }
        }
        if self.depart_rate == 0 {
            return invalid("depart_rate must be positive".to_string());
        }
        if self.detector_capacity <= 0.0 || !self.detector_capacity.is_finite() {
            return invalid("detector_capacity must be positive".to_string());
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

/// A single intersection with point queues.
///
/// Each step first lets up to `depart_rate` vehicles of every approach served by the
/// green phase cross into their outgoing link, then lets up to `exit_rate` vehicles
/// leave every outgoing link, then adds arrivals. Vehicles are kept in FIFO order
/// with their arrival time so that waiting times are exact.
pub struct SyntheticIntersection {
    config: SyntheticConfig,
    rng: StdRng,
    time: usize,
    queues: Vec<VecDeque<usize>>,
    outgoing: Vec<usize>,
    faults_left: usize,
}

impl SyntheticIntersection {
    fn snapshot(&self, departed: usize) -> SimSnapshot {
        let queues: Vec<f32> = self.queues.iter().map(|q| q.len() as f32).collect();
        let waiting = self
            .queues
            .iter()
            .map(|q| q.iter().map(|&arrival| (self.time - arrival) as f32).sum())
            .collect();
        let occupancy = queues
            .iter()
            .map(|&q| (q / self.config.detector_capacity).min(1.0))
            .collect();
        SimSnapshot {
            time: self.time,
            queues,
            waiting,
            outgoing: self.outgoing.iter().map(|&n| n as f32).collect(),
            occupancy,
            departed: departed as f32,
        }
    }

    fn arrive(&mut self) {
        let t = self.time;
        match &self.config.demand {
            Demand::Bernoulli { rates } => {
                for (q, &rate) in self.queues.iter_mut().zip(rates.iter()) {
                    // one draw per approach keeps the stream aligned across policies
                    if self.rng.gen::<f64>() < rate {
                        q.push_back(t);
                    }
                }
            }
            Demand::Periodic { periods } => {
                for (q, &period) in self.queues.iter_mut().zip(periods.iter()) {
                    if period > 0 && t % period == 0 {
                        q.push_back(t);
                    }
                }
            }
        }
    }
}

impl Simulator for SyntheticIntersection {
    type Config = SyntheticConfig;

    fn build(config: &Self::Config) -> Result<Self, SimulatorError> {
        config
            .validate()
            .map_err(|e| SimulatorError::Unavailable(e.to_string()))?;
        Ok(Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(0),
            time: 0,
            queues: vec![VecDeque::new(); config.layout.n_approaches()],
            outgoing: vec![0; config.layout.n_links()],
            faults_left: 0,
        })
    }

    fn layout(&self) -> &IntersectionLayout {
        &self.config.layout
    }

    fn reset(&mut self, seed: u64) -> Result<SimSnapshot, SimulatorError> {
        self.rng = StdRng::seed_from_u64(seed);
        self.time = 0;
        self.queues.iter_mut().for_each(|q| q.clear());
        self.outgoing.iter_mut().for_each(|n| *n = 0);
        self.faults_left = self.config.fault_repeats;
        Ok(self.snapshot(0))
    }

    fn step(&mut self, phase: usize) -> Result<SimSnapshot, SimulatorError> {
        if self.config.fault_at_step == Some(self.time) && self.faults_left > 0 {
            self.faults_left -= 1;
            return Err(SimulatorError::Fault(format!(
                "injected fault at t = {}",
                self.time
            )));
        }
        let movements = match self.config.layout.phases.get(phase) {
            Some(p) => p.movements.clone(),
            None => {
                return Err(SimulatorError::Unavailable(format!(
                    "unknown phase {}",
                    phase
                )))
            }
        };

        // Vehicles of an approach follow its movements in turn.
        let mut departed = 0;
        let mut capacity = vec![self.config.depart_rate; self.queues.len()];
        let mut progress = true;
        while progress {
            progress = false;
            for m in movements.iter() {
                if capacity[m.from] > 0 && self.queues[m.from].pop_front().is_some() {
                    capacity[m.from] -= 1;
                    self.outgoing[m.to] += 1;
                    departed += 1;
                    progress = true;
                }
            }
        }

        for n in self.outgoing.iter_mut() {
            *n = n.saturating_sub(self.config.exit_rate);
        }

        self.arrive();
        self.time += 1;
        trace!("t = {}, phase = {}, departed = {}", self.time, phase, departed);
        Ok(self.snapshot(departed))
    }
}
