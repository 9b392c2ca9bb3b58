//! Structured logging sink for monitor events.
//!
//! [`EventLog`] subscribes to the [`EventBus`](crate::bus::EventBus) and
//! writes every [`MonitorEvent`] through `tracing`, so operators get one
//! log line per outcome. It shuts down when the bus is dropped.

use tokio::sync::broadcast;

use crate::bus::{EventKind, MonitorEvent};

pub struct EventLog;

impl EventLog {
    /// Run the logging loop until the channel closes. Returns the number of
    /// events logged.
    pub async fn run(mut receiver: broadcast::Receiver<MonitorEvent>) -> usize {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    Self::log(&event);
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Event bus closed, event log shutting down");
                    break;
                }
            }
        }
        logged
    }

    fn log(event: &MonitorEvent) {
        let payload = serde_json::to_string(&event.kind).unwrap_or_default();
        let event_type = event.event_type();

        match &event.kind {
            EventKind::SourceFailed { .. }
            | EventKind::DeliveryFailed { .. }
            | EventKind::LedgerWriteFailed { .. } => {
                tracing::warn!(
                    session_id = %event.session_id,
                    event_type,
                    payload = %payload,
                    "Monitor event"
                );
            }
            _ => {
                tracing::info!(
                    session_id = %event.session_id,
                    event_type,
                    payload = %payload,
                    "Monitor event"
                );
            }
        }
    }
}
