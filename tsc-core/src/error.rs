//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Public operations return [`anyhow::Result`]; callers recover the kind of a failure
/// with `err.downcast_ref::<TscError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TscError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The replay buffer holds fewer transitions than requested.
    #[error("Insufficient data in replay buffer: requested {requested}, available {available}")]
    InsufficientData {
        /// Requested batch size.
        requested: usize,

        /// Number of transitions in the buffer.
        available: usize,
    },

    /// A comparison across seeds was requested with fewer than two seeds.
    #[error("At least 2 seeds are required for a comparison, got {0}")]
    InsufficientSeeds(usize),

    /// Invalid configuration, detected before any episode runs.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A controller chose an action outside the action space.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// The simulator produced a state that violates the observation contract.
    #[error("Malformed state from simulator: {0}")]
    MalformedState(String),

    /// A value estimator produced NaN or infinity.
    #[error("Non-finite value: {0}")]
    NonFinite(String),

    /// The simulator signalled a fault during a step.
    #[error("Simulator fault: {0}")]
    SimulatorFault(String),

    /// The simulator cannot be used at all (e.g. it fails to reset).
    #[error("Simulator unavailable: {0}")]
    SimulatorUnavailable(String),

    /// A mutex guarding shared state was poisoned by a panicking thread.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl TscError {
    /// Returns `true` if the error only invalidates the current episode.
    ///
    /// Such failures are recorded on the episode log and excluded from aggregate
    /// statistics. Every other error aborts the caller.
    pub fn is_episode_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidAction(_)
                | Self::MalformedState(_)
                | Self::NonFinite(_)
                | Self::SimulatorFault(_)
        )
    }
}

/// Returns the [`TscError`] carried by `err`, if any.
pub fn classify(err: &anyhow::Error) -> Option<&TscError> {
    err.downcast_ref::<TscError>()
}
