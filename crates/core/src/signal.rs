//! Normalized funding-rate readings.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Long-bias alerts project a take-profit 40% above the current price.
pub const TAKE_PROFIT_MULTIPLIER: f64 = 1.40;

// ---------------------------------------------------------------------------
// SignalKey
// ---------------------------------------------------------------------------

/// Dedup key for hysteresis and cooldown: one per (venue, symbol).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub venue: String,
    pub symbol: String,
}

impl SignalKey {
    pub fn new(venue: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            symbol: symbol.into(),
        }
    }
}

/// Renders as `"<venue>-<symbol>"`, the persisted key format.
impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.venue, self.symbol)
    }
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// One funding-rate reading for one instrument on one venue.
///
/// A fresh `Signal` is produced every polling cycle; derived values such as
/// the take-profit projection are attached by building a new value via
/// [`Signal::with_take_profit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Venue display name, e.g. `"Binance"`.
    pub venue: String,
    /// Base asset, e.g. `"BTC"`.
    pub symbol: String,
    /// Trading pair, e.g. `"BTCUSDT"`.
    pub pair: String,
    pub current_price: f64,
    /// Signed funding rate in percent points (`-0.1` means -0.1%).
    pub funding_rate: f64,
    /// Set only on presentation signals handed to notifiers.
    pub target_price: Option<f64>,
    pub captured_at: Timestamp,
}

impl Signal {
    pub fn new(
        venue: impl Into<String>,
        symbol: impl Into<String>,
        pair: impl Into<String>,
        current_price: f64,
        funding_rate: f64,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            venue: venue.into(),
            symbol: symbol.into(),
            pair: pair.into(),
            current_price,
            funding_rate,
            target_price: None,
            captured_at,
        }
    }

    pub fn key(&self) -> SignalKey {
        SignalKey::new(self.venue.clone(), self.symbol.clone())
    }

    /// A zero or negative price makes any derived target meaningless.
    pub fn has_tradeable_price(&self) -> bool {
        self.current_price.is_finite() && self.current_price > 0.0
    }

    /// Build the presentation copy delivered to notification channels.
    pub fn with_take_profit(&self) -> Signal {
        Signal {
            target_price: take_profit_price(self.funding_rate, self.current_price),
            ..self.clone()
        }
    }
}

/// Negative funding (shorts paying longs) gets a take-profit projection;
/// non-negative funding gets none.
pub fn take_profit_price(funding_rate: f64, current_price: f64) -> Option<f64> {
    (funding_rate < 0.0).then(|| current_price * TAKE_PROFIT_MULTIPLIER)
}

/// Order signals by venue name, then trading pair.
///
/// Delivery follows this order, so it has to be total and reproducible.
pub fn sort_signals(signals: &mut [Signal]) {
    signals.sort_by(compare_for_delivery);
}

pub fn compare_for_delivery(a: &Signal, b: &Signal) -> Ordering {
    a.venue.cmp(&b.venue).then_with(|| a.pair.cmp(&b.pair))
}
