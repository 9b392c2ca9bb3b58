//! Ordered multi-channel delivery of triggered signals.
//!
//! For every triggered signal that clears the cooldown ledger,
//! [`DeliveryFanout`] builds the presentation copy (with take-profit), tries
//! every enabled channel in configured order, and then records the send.
//! Recording is attempt-based: a signal every channel rejected is still
//! recorded, so a flapping channel cannot turn into an alert storm.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fundwatch_core::Signal;
use fundwatch_ledger::CooldownLedger;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::{EventBus, EventKind};
use crate::delivery::Notifier;

/// Per-session delivery settings.
#[derive(Debug, Clone)]
pub struct FanoutSettings {
    /// Enabled channel ids, in delivery order.
    pub channels: Vec<String>,
    pub action_url: Option<String>,
    pub cooldown: chrono::Duration,
    /// Gap between two delivered signals.
    pub pacing: Duration,
}

/// Outcome of one [`DeliveryFanout::dispatch`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Signals that went through channel delivery and were recorded.
    pub delivered: usize,
    /// Signals held back by the cooldown ledger.
    pub suppressed: usize,
    /// Individual channel sends that failed.
    pub channel_failures: usize,
    /// Signals never looked at because the session was cancelled.
    pub skipped: usize,
}

pub struct DeliveryFanout {
    notifier: Arc<dyn Notifier>,
    ledger: Arc<CooldownLedger>,
    bus: Arc<EventBus>,
    session_id: Uuid,
    settings: FanoutSettings,
}

impl DeliveryFanout {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        ledger: Arc<CooldownLedger>,
        bus: Arc<EventBus>,
        session_id: Uuid,
        settings: FanoutSettings,
    ) -> Self {
        Self {
            notifier,
            ledger,
            bus,
            session_id,
            settings,
        }
    }

    /// Deliver `triggered` in the order given.
    ///
    /// Stops taking new signals once `cancel` fires; a signal already being
    /// sent finishes its channel loop and is recorded.
    pub async fn dispatch(
        &self,
        triggered: &[Signal],
        cancel: &CancellationToken,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut delivered_any = false;

        for (idx, signal) in triggered.iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = triggered.len() - idx;
                break;
            }

            if !self
                .ledger
                .can_send(&signal.venue, &signal.symbol, self.settings.cooldown)
                .await
            {
                tracing::debug!(key = %signal.key(), "Alert suppressed by cooldown");
                report.suppressed += 1;
                self.bus.emit(
                    self.session_id,
                    EventKind::CooldownSuppressed {
                        venue: signal.venue.clone(),
                        symbol: signal.symbol.clone(),
                    },
                );
                continue;
            }

            if delivered_any && !self.settings.pacing.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        report.skipped = triggered.len() - idx;
                        break;
                    }
                    _ = tokio::time::sleep(self.settings.pacing) => {}
                }
            }

            report.channel_failures += self.deliver(signal).await;
            report.delivered += 1;
            delivered_any = true;
        }

        report
    }

    /// Send one signal to every channel and record it. Returns the number
    /// of failed channel sends.
    async fn deliver(&self, signal: &Signal) -> usize {
        let presented = signal.with_take_profit();
        let action_url = self.settings.action_url.as_deref();
        let attempted = self.settings.channels.len();
        let mut accepted = 0;

        for channel_id in &self.settings.channels {
            match self.notifier.send(&presented, channel_id, action_url).await {
                Ok(()) => {
                    accepted += 1;
                    tracing::debug!(key = %signal.key(), channel_id, "Alert sent");
                }
                Err(e) => {
                    tracing::error!(
                        key = %signal.key(),
                        channel_id,
                        error = %e,
                        "Alert delivery failed"
                    );
                    self.bus.emit(
                        self.session_id,
                        EventKind::DeliveryFailed {
                            venue: signal.venue.clone(),
                            symbol: signal.symbol.clone(),
                            channel_id: channel_id.clone(),
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        if let Err(e) = self
            .ledger
            .record_send(&signal.venue, &signal.symbol, Utc::now())
            .await
        {
            tracing::warn!(key = %signal.key(), error = %e, "Failed to persist sent record");
            self.bus.emit(
                self.session_id,
                EventKind::LedgerWriteFailed {
                    key: signal.key().to_string(),
                    error: e.to_string(),
                },
            );
        }

        tracing::info!(
            key = %signal.key(),
            funding_rate = signal.funding_rate,
            accepted,
            attempted,
            "Alert dispatched"
        );
        self.bus.emit(
            self.session_id,
            EventKind::AlertDelivered {
                venue: signal.venue.clone(),
                symbol: signal.symbol.clone(),
                pair: signal.pair.clone(),
                funding_rate: signal.funding_rate,
                channels_accepted: accepted,
                channels_attempted: attempted,
            },
        );

        attempted - accepted
    }
}
