//! Key-value records emitted by environment steps, agent updates and episodes.
//!
//! A [`Record`] is a small string-keyed container. The environment adapter uses it to
//! report substituted actions and simulator faults, agents use it to report the loss
//! and exploration rate of an update, and [`Recorder`]s collect records for later use.
//!
//! ```rust
//! use tsc_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("loss", RecordValue::Scalar(0.25));
//! record.insert("controller", RecordValue::String("dqn".to_string()));
//! assert_eq!(record.get_scalar("loss").unwrap(), 0.25);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
