//! Boundary to traffic simulators.
use crate::IntersectionLayout;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors signalled by a simulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    /// The step could not be completed. The simulator state is unchanged, so the
    /// step may be retried.
    #[error("Simulator fault: {0}")]
    Fault(String),

    /// The simulator cannot be used anymore.
    #[error("Simulator unavailable: {0}")]
    Unavailable(String),
}

/// Raw state of the intersection reported by a simulator after `reset` or `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSnapshot {
    /// Simulation clock in steps.
    pub time: usize,

    /// Queued vehicles per incoming approach.
    pub queues: Vec<f32>,

    /// Accumulated waiting time of the queued vehicles per incoming approach.
    pub waiting: Vec<f32>,

    /// Queued vehicles per outgoing link.
    pub outgoing: Vec<f32>,

    /// Detector occupancy per incoming approach.
    pub occupancy: Vec<f32>,

    /// Vehicles that crossed the stop line during the last step.
    pub departed: f32,
}

/// A traffic simulator of a single intersection.
///
/// Only [`IntersectionEnv`](crate::IntersectionEnv) calls these methods.
pub trait Simulator {
    /// Configuration of the simulator.
    type Config: Clone + std::fmt::Debug + Serialize + DeserializeOwned;

    /// Builds the simulator.
    fn build(config: &Self::Config) -> Result<Self, SimulatorError>
    where
        Self: Sized;

    /// Geometry of the simulated intersection.
    fn layout(&self) -> &IntersectionLayout;

    /// Restarts the simulation with the given seed.
    fn reset(&mut self, seed: u64) -> Result<SimSnapshot, SimulatorError>;

    /// Advances the clock by one step with `phase` green.
    fn step(&mut self, phase: usize) -> Result<SimSnapshot, SimulatorError>;
}
