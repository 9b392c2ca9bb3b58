//! One polling cycle.

use std::sync::Arc;
use std::time::Instant;

use fundwatch_core::evaluator::{FiredState, Threshold, Verdict};
use fundwatch_core::signal::compare_for_delivery;
use fundwatch_core::{Signal, VenueConfig};
use fundwatch_events::{DeliveryFanout, DispatchReport, EventBus, EventKind};
use fundwatch_sources::SignalSource;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// An enabled venue paired with the source that polls it.
#[derive(Clone)]
pub struct VenueBinding {
    pub config: VenueConfig,
    pub source: Arc<dyn SignalSource>,
}

/// Counters for one cycle, also published as `CycleCompleted`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Signals that survived filtering and were evaluated.
    pub signals: usize,
    pub triggered: usize,
    pub rearmed: usize,
    pub failed_sources: usize,
    pub dispatch: DispatchReport,
    /// Cancellation cut the cycle short.
    pub cancelled: bool,
}

pub struct CycleRunner {
    venues: Vec<VenueBinding>,
    fanout: DeliveryFanout,
    bus: Arc<EventBus>,
    session_id: Uuid,
}

impl CycleRunner {
    pub fn new(
        venues: Vec<VenueBinding>,
        fanout: DeliveryFanout,
        bus: Arc<EventBus>,
        session_id: Uuid,
    ) -> Self {
        Self {
            venues,
            fanout,
            bus,
            session_id,
        }
    }

    /// Run one cycle against `fired`.
    ///
    /// An in-flight fetch always completes; venues after it are skipped once
    /// `cancel` fires.
    pub async fn run(&self, fired: &mut FiredState, cancel: &CancellationToken) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        let Some(mut candidates) = self.collect(cancel, &mut report).await else {
            report.cancelled = true;
            tracing::info!("Cycle cancelled during fetch");
            return report;
        };

        candidates.sort_by(|(a, _), (b, _)| compare_for_delivery(a, b));
        report.signals = candidates.len();

        let mut triggered = Vec::new();
        for (signal, threshold) in candidates {
            let verdict = fired.evaluate(&signal, threshold);
            tracing::debug!(
                key = %signal.key(),
                funding_rate = signal.funding_rate,
                threshold = threshold.value(),
                verdict = ?verdict,
                "Signal evaluated"
            );
            match verdict {
                Verdict::Triggered => triggered.push(signal),
                Verdict::Rearmed => report.rearmed += 1,
                Verdict::Holding | Verdict::Idle => {}
            }
        }
        report.triggered = triggered.len();

        report.dispatch = self.fanout.dispatch(&triggered, cancel).await;
        report.cancelled = cancel.is_cancelled();

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            signals = report.signals,
            triggered = report.triggered,
            delivered = report.dispatch.delivered,
            suppressed = report.dispatch.suppressed,
            failed_sources = report.failed_sources,
            duration_ms,
            "Monitoring cycle complete"
        );
        self.bus.emit(
            self.session_id,
            EventKind::CycleCompleted {
                signals: report.signals,
                triggered: report.triggered,
                delivered: report.dispatch.delivered,
                suppressed: report.dispatch.suppressed,
                failed_sources: report.failed_sources,
                duration_ms,
            },
        );

        report
    }

    /// Fetch every venue in turn. `None` when cancelled between venues.
    async fn collect(
        &self,
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) -> Option<Vec<(Signal, Threshold)>> {
        let mut candidates = Vec::new();

        for binding in &self.venues {
            if cancel.is_cancelled() {
                return None;
            }

            let venue = binding.config.venue;
            let threshold = Threshold::new(binding.config.threshold);

            let signals = match binding
                .source
                .fetch_signals(&binding.config.credentials)
                .await
            {
                Ok(signals) => signals,
                Err(e) => {
                    tracing::warn!(venue = %venue, error = %e, "Failed to fetch funding rates");
                    report.failed_sources += 1;
                    self.bus.emit(
                        self.session_id,
                        EventKind::SourceFailed {
                            venue: venue.name().to_string(),
                            error: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            tracing::debug!(venue = %venue, count = signals.len(), "Funding rates fetched");

            for signal in signals {
                if signal.venue != venue.name() {
                    tracing::debug!(
                        venue = %venue,
                        tagged = %signal.venue,
                        pair = %signal.pair,
                        "Dropping signal tagged with another venue"
                    );
                    continue;
                }
                if !signal.has_tradeable_price() {
                    tracing::debug!(key = %signal.key(), "Dropping signal without a positive price");
                    continue;
                }
                candidates.push((signal, threshold));
            }
        }

        Some(candidates)
    }
}
