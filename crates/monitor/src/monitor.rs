//! Session lifecycle for the polling scheduler.
//!
//! [`Monitor`] is created once with its collaborators and can be started and
//! stopped any number of times. Each start validates the configuration,
//! mints a session id and a [`CancellationToken`], and spawns:
//!
//! - the cycle loop, which owns the session's [`FiredState`];
//! - the ledger retention loop.
//!
//! Both run inside a `monitor_session` span carrying the session id.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use fundwatch_core::evaluator::FiredState;
use fundwatch_core::{ConfigError, MonitorConfig};
use fundwatch_events::{DeliveryFanout, EventBus, EventKind, FanoutSettings, Notifier};
use fundwatch_ledger::{retention, CooldownLedger};
use fundwatch_sources::SignalSource;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::cycle::{CycleRunner, VenueBinding};
use crate::error::MonitorError;

/// How long stop waits for each session task.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Running,
    Stopping,
}

/// Handles of one running session.
struct Session {
    id: Uuid,
    cancel: CancellationToken,
    cycle: JoinHandle<()>,
    retention: JoinHandle<()>,
}

struct Inner {
    state: MonitorState,
    config: MonitorConfig,
    session: Option<Session>,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor {
    sources: Vec<Arc<dyn SignalSource>>,
    notifier: Arc<dyn Notifier>,
    ledger: Arc<CooldownLedger>,
    bus: Arc<EventBus>,
    inner: Mutex<Inner>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        sources: Vec<Arc<dyn SignalSource>>,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<CooldownLedger>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            sources,
            notifier,
            ledger,
            bus,
            inner: Mutex::new(Inner {
                state: MonitorState::Idle,
                config,
                session: None,
            }),
        }
    }

    pub async fn state(&self) -> MonitorState {
        self.inner.lock().await.state
    }

    /// Id of the running session, if any.
    pub async fn session_id(&self) -> Option<Uuid> {
        self.inner.lock().await.session.as_ref().map(|s| s.id)
    }

    /// Replace the configuration used by the next session.
    pub async fn update_config(&self, config: MonitorConfig) -> Result<(), MonitorError> {
        let mut inner = self.inner.lock().await;
        ensure_idle(inner.state)?;
        inner.config = config;
        Ok(())
    }

    /// Validate the configuration and start a new monitoring session.
    ///
    /// Nothing is spawned unless every check passes. The first cycle runs
    /// immediately.
    pub async fn start(&self) -> Result<Uuid, MonitorError> {
        let mut inner = self.inner.lock().await;
        ensure_idle(inner.state)?;

        inner.config.validate()?;
        let venues = self.bind_sources(&inner.config)?;

        let config = &inner.config;
        let timing = &config.timing;
        let session_id = Uuid::now_v7();
        let cancel = CancellationToken::new();
        let span = tracing::info_span!("monitor_session", %session_id);

        let fanout = DeliveryFanout::new(
            Arc::clone(&self.notifier),
            Arc::clone(&self.ledger),
            Arc::clone(&self.bus),
            session_id,
            FanoutSettings {
                channels: config.enabled_channel_ids(),
                action_url: config.action_url.clone(),
                cooldown: timing.cooldown(),
                pacing: timing.pacing(),
            },
        );
        let venue_names: Vec<String> = venues
            .iter()
            .map(|b| b.config.venue.name().to_string())
            .collect();
        let runner = CycleRunner::new(venues, fanout, Arc::clone(&self.bus), session_id);

        let channels = config.enabled_channel_ids().len();
        tracing::info!(
            %session_id,
            venues = ?venue_names,
            channels,
            poll_interval_secs = timing.poll_interval_secs,
            "Monitoring started"
        );
        self.bus.emit(
            session_id,
            EventKind::SessionStarted {
                venues: venue_names,
                channels,
            },
        );

        let cycle = tokio::spawn(
            run_cycles(runner, timing.poll_interval(), cancel.clone()).instrument(span.clone()),
        );
        let retention = tokio::spawn(
            retention::run(
                Arc::clone(&self.ledger),
                timing.retention(),
                timing.cleanup_interval(),
                cancel.clone(),
            )
            .instrument(span),
        );

        inner.state = MonitorState::Running;
        inner.session = Some(Session {
            id: session_id,
            cancel,
            cycle,
            retention,
        });

        Ok(session_id)
    }

    /// Stop the running session. A no-op when idle or already stopping.
    ///
    /// Cancellation lets an in-flight venue fetch finish; each task then
    /// gets up to five seconds before it is aborted. The state only returns
    /// to idle once both tasks have ended.
    pub async fn stop(&self) {
        let session = {
            let mut inner = self.inner.lock().await;
            if inner.state != MonitorState::Running {
                return;
            }
            inner.state = MonitorState::Stopping;
            inner.session.take()
        };

        if let Some(session) = session {
            tracing::info!(session_id = %session.id, "Stopping monitoring");
            session.cancel.cancel();

            for (task, mut handle) in [("cycle", session.cycle), ("retention", session.retention)]
            {
                match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!(task, error = %e, "Session task ended abnormally");
                    }
                    Err(_) => {
                        tracing::warn!(task, "Session task did not stop in time, aborting");
                        handle.abort();
                        // The task must be gone before the state returns to idle.
                        let _ = handle.await;
                    }
                }
            }

            self.bus.emit(session.id, EventKind::SessionStopped);
            tracing::info!(session_id = %session.id, "Monitoring stopped");
        }

        self.inner.lock().await.state = MonitorState::Idle;
    }

    // ---- private helpers ----

    /// Pair every enabled venue with its injected source.
    fn bind_sources(&self, config: &MonitorConfig) -> Result<Vec<VenueBinding>, ConfigError> {
        config
            .enabled_venues()
            .map(|venue| {
                self.sources
                    .iter()
                    .find(|s| s.venue() == venue.venue)
                    .map(|source| VenueBinding {
                        config: venue.clone(),
                        source: Arc::clone(source),
                    })
                    .ok_or(ConfigError::NoSourceForVenue { venue: venue.venue })
            })
            .collect()
    }
}

fn ensure_idle(state: MonitorState) -> Result<(), MonitorError> {
    match state {
        MonitorState::Idle => Ok(()),
        MonitorState::Running => Err(MonitorError::AlreadyRunning),
        MonitorState::Stopping => Err(MonitorError::StopInProgress),
    }
}

/// Cycle loop. Only cancellation ends it; a panicking cycle is logged and
/// the next one runs after the usual interval.
async fn run_cycles(runner: CycleRunner, every: Duration, cancel: CancellationToken) {
    let mut fired = FiredState::new();

    loop {
        let outcome = AssertUnwindSafe(runner.run(&mut fired, &cancel))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            tracing::error!(panic = %panic_message(panic.as_ref()), "Monitoring cycle panicked");
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(every) => {}
        }
    }

    tracing::debug!(alerted_keys = fired.len(), "Cycle loop exited");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
