//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The monitor publishes a [`MonitorEvent`] for every outcome a shell might
//! want to present: session lifecycle, per-venue fetch failures, per-channel
//! delivery failures, cooldown suppressions and cycle summaries. Publishing
//! never blocks and never fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// MonitorEvent
// ---------------------------------------------------------------------------

/// Something that happened inside one monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    /// Session that produced the event.
    pub session_id: Uuid,

    #[serde(flatten)]
    pub kind: EventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl MonitorEvent {
    pub fn new(session_id: Uuid, kind: EventKind) -> Self {
        Self {
            session_id,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Dot-separated event name, e.g. `"delivery.failed"`.
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

/// Event payloads. Serialized with an `"event"` tag so log sinks can filter
/// on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted {
        venues: Vec<String>,
        channels: usize,
    },
    SessionStopped,
    /// One venue's fetch failed; that venue is absent from this cycle.
    SourceFailed {
        venue: String,
        error: String,
    },
    /// A triggered signal was held back by the cooldown ledger.
    CooldownSuppressed {
        venue: String,
        symbol: String,
    },
    /// One channel rejected or never received an alert.
    DeliveryFailed {
        venue: String,
        symbol: String,
        channel_id: String,
        error: String,
    },
    /// All channel attempts for one signal are done.
    AlertDelivered {
        venue: String,
        symbol: String,
        pair: String,
        funding_rate: f64,
        channels_accepted: usize,
        channels_attempted: usize,
    },
    LedgerWriteFailed {
        key: String,
        error: String,
    },
    CycleCompleted {
        signals: usize,
        triggered: usize,
        delivered: usize,
        suppressed: usize,
        failed_sources: usize,
        duration_ms: u64,
    },
}

impl EventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session.started",
            Self::SessionStopped => "session.stopped",
            Self::SourceFailed { .. } => "source.failed",
            Self::CooldownSuppressed { .. } => "cooldown.suppressed",
            Self::DeliveryFailed { .. } => "delivery.failed",
            Self::AlertDelivered { .. } => "alert.delivered",
            Self::LedgerWriteFailed { .. } => "ledger.write_failed",
            Self::CycleCompleted { .. } => "cycle.completed",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus, shared via `Arc<EventBus>`.
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers lose the oldest events and observe
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: MonitorEvent) {
        // Zero receivers is the only send error.
        let _ = self.sender.send(event);
    }

    /// Shorthand for `publish(MonitorEvent::new(session_id, kind))`.
    pub fn emit(&self, session_id: Uuid, kind: EventKind) {
        self.publish(MonitorEvent::new(session_id, kind));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
