#![warn(missing_docs)]
//! Rule-based traffic-signal controllers.
//!
//! The controllers implement [`Policy`](tsc_core::Policy) on
//! [`IntersectionEnv`](tsc_env::IntersectionEnv) with any simulator. They read the
//! current [`IntersectionObs`](tsc_env::IntersectionObs) only and do not learn.
mod actuated;
mod fixed_cycle;
mod max_pressure;
pub use actuated::{Actuated, ActuatedConfig};
pub use fixed_cycle::{FixedCycle, FixedCycleConfig};
pub use max_pressure::{MaxPressure, MaxPressureConfig, PressureMode};
