//! Domain types and pure logic for the funding-rate alerting engine.
//!
//! This crate has no I/O and no async runtime dependency so it can be
//! shared by the ledger, the sources, the delivery layer and the
//! scheduler alike.
//!
//! - [`signal`] -- normalized readings and the take-profit rule.
//! - [`venue`] -- the supported derivatives venues.
//! - [`config`] -- monitoring configuration and pre-start validation.
//! - [`evaluator`] -- sign-aware thresholds with edge-triggered hysteresis.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod signal;
pub mod types;
pub mod venue;

pub use config::{ChannelConfig, Credentials, MonitorConfig, Timing, VenueConfig};
pub use error::ConfigError;
pub use evaluator::{FiredState, Threshold, Verdict};
pub use signal::{Signal, SignalKey};
pub use venue::VenueKind;
