//! Sign-aware threshold evaluation with edge-triggered hysteresis.
//!
//! A key fires once when its condition starts to hold, stays silent while
//! the condition persists, and re-arms only after the rate crosses back.
//! Everything here is synchronous and allocation-light; the scheduler calls
//! it once per signal per cycle.

use std::collections::HashSet;

use crate::signal::{Signal, SignalKey};

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// A signed alert boundary. The sign selects the comparison direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Negative thresholds fire at or below, non-negative at or above.
    pub fn should_fire(self, funding_rate: f64) -> bool {
        if self.0 < 0.0 {
            funding_rate <= self.0
        } else {
            funding_rate >= self.0
        }
    }

    /// The rate has moved back across the boundary.
    pub fn should_reset(self, funding_rate: f64) -> bool {
        if self.0 < 0.0 {
            funding_rate > self.0
        } else {
            funding_rate < self.0
        }
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of evaluating one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Condition started to hold; the signal is a delivery candidate.
    Triggered,
    /// Condition still holds for an already-alerted key.
    Holding,
    /// Condition cleared for an alerted key; it may fire again later.
    Rearmed,
    /// Nothing to do.
    Idle,
}

impl Verdict {
    pub fn is_triggered(self) -> bool {
        matches!(self, Self::Triggered)
    }
}

// ---------------------------------------------------------------------------
// FiredState
// ---------------------------------------------------------------------------

/// Keys currently considered "in alert".
///
/// Owned by exactly one monitoring session; dropping it is how a session
/// forgets its alerts on stop.
#[derive(Debug, Default)]
pub struct FiredState {
    keys: HashSet<SignalKey>,
}

impl FiredState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &SignalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Apply the hysteresis transition for `signal` against `threshold`.
    pub fn evaluate(&mut self, signal: &Signal, threshold: Threshold) -> Verdict {
        let key = signal.key();
        let rate = signal.funding_rate;

        if threshold.should_fire(rate) {
            if self.keys.insert(key) {
                Verdict::Triggered
            } else {
                Verdict::Holding
            }
        } else if threshold.should_reset(rate) && self.keys.remove(&key) {
            Verdict::Rearmed
        } else {
            Verdict::Idle
        }
    }
}
