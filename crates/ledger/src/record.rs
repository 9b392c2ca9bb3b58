use chrono::Duration;
use fundwatch_core::signal::SignalKey;
use fundwatch_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// The most recent alert sent for one (venue, symbol) key.
///
/// Field names on disk match the `sent_signals.json` files written by
/// earlier releases, so existing ledgers keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentRecord {
    #[serde(rename = "exchangeName")]
    pub venue: String,
    pub symbol: String,
    #[serde(rename = "lastSentTime")]
    pub last_sent: Timestamp,
}

impl SentRecord {
    pub fn new(venue: impl Into<String>, symbol: impl Into<String>, last_sent: Timestamp) -> Self {
        Self {
            venue: venue.into(),
            symbol: symbol.into(),
            last_sent,
        }
    }

    pub fn key(&self) -> SignalKey {
        SignalKey::new(self.venue.clone(), self.symbol.clone())
    }

    /// At least `interval` has elapsed since the last send.
    pub fn cooled_down(&self, interval: Duration, now: Timestamp) -> bool {
        now - self.last_sent >= interval
    }

    /// Sent before `cutoff`.
    pub fn is_older_than(&self, cutoff: Timestamp) -> bool {
        self.last_sent < cutoff
    }
}
