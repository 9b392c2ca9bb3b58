//! The polling scheduler.
//!
//! [`Monitor`] owns the session lifecycle (`Idle -> Running -> Stopping ->
//! Idle`) and spawns one cycle task plus one ledger-retention task per
//! session. [`CycleRunner`] performs a single polling cycle: fetch every
//! enabled venue, filter and sort the signals, run them through the
//! hysteresis evaluator and hand the triggered ones to the delivery fan-out.

pub mod cycle;
pub mod error;
pub mod monitor;

pub use cycle::{CycleReport, CycleRunner, VenueBinding};
pub use error::MonitorError;
pub use monitor::{Monitor, MonitorState};
