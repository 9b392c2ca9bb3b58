//! Integration tests for the [`Monitor`] session lifecycle.
//!
//! Time is paused so the poll interval elapses instantly once every task
//! is idle.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{as_source, config_for, RecordingNotifier, ScriptedSource, Step};
use fundwatch_core::{ConfigError, Signal, VenueKind};
use fundwatch_events::{DeliveryError, EventBus, EventKind, Notifier};
use fundwatch_ledger::CooldownLedger;
use fundwatch_monitor::{Monitor, MonitorError, MonitorState};
use fundwatch_sources::SignalSource;

struct Harness {
    monitor: Monitor,
    notifier: Arc<RecordingNotifier>,
    bus: Arc<EventBus>,
}

fn harness(venues: &[VenueKind], sources: Vec<Arc<dyn SignalSource>>) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let bus = Arc::new(EventBus::default());
    let monitor = Monitor::new(
        config_for(venues),
        sources,
        notifier.clone(),
        Arc::new(CooldownLedger::in_memory()),
        Arc::clone(&bus),
    );
    Harness {
        monitor,
        notifier,
        bus,
    }
}

/// Wait (in paused time) until the notifier has seen `count` sends.
async fn wait_for_sends(notifier: &RecordingNotifier, count: usize) {
    for _ in 0..1000 {
        if notifier.count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!(
        "expected {count} sends, got {}: {:?}",
        notifier.count(),
        notifier.sent()
    );
}

fn btc_source(rate: f64) -> Arc<ScriptedSource> {
    Arc::new(ScriptedSource::constant(
        VenueKind::Bybit,
        vec![("BTCUSDT", 100.0, rate)],
    ))
}

// ---------------------------------------------------------------------------
// Test: start validates configuration before spawning anything
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_rejects_missing_bot_token() {
    let h = harness(&[VenueKind::Bybit], vec![as_source(&btc_source(-0.2))]);
    let mut config = config_for(&[VenueKind::Bybit]);
    config.bot_token = None;
    h.monitor.update_config(config).await.unwrap();

    assert_eq!(
        h.monitor.start().await,
        Err(MonitorError::Config(ConfigError::MissingBotToken))
    );
    assert_eq!(h.monitor.state().await, MonitorState::Idle);
}

#[tokio::test]
async fn start_rejects_no_enabled_channel() {
    let h = harness(&[VenueKind::Bybit], vec![as_source(&btc_source(-0.2))]);
    let mut config = config_for(&[VenueKind::Bybit]);
    config.channels[0].enabled = false;
    h.monitor.update_config(config).await.unwrap();

    assert_matches!(
        h.monitor.start().await,
        Err(MonitorError::Config(ConfigError::NoChannelEnabled))
    );
}

#[tokio::test]
async fn start_rejects_enabled_venue_without_source() {
    let h = harness(
        &[VenueKind::Bybit, VenueKind::Mexc],
        vec![as_source(&btc_source(-0.2))],
    );

    assert_matches!(
        h.monitor.start().await,
        Err(MonitorError::Config(ConfigError::NoSourceForVenue {
            venue: VenueKind::Mexc
        }))
    );
    assert_eq!(h.monitor.session_id().await, None);
}

#[tokio::test]
async fn start_rejects_out_of_range_windows() {
    let h = harness(&[VenueKind::Bybit], vec![as_source(&btc_source(-0.2))]);

    let mut config = config_for(&[VenueKind::Bybit]);
    config.timing.cooldown_hours = 10_000_000_000_000;
    h.monitor.update_config(config).await.unwrap();
    assert_matches!(
        h.monitor.start().await,
        Err(MonitorError::Config(ConfigError::InvalidValue { var, .. })) if var == "COOLDOWN_HOURS"
    );

    let mut config = config_for(&[VenueKind::Bybit]);
    config.timing.retention_hours = 1_000_000_000_000;
    h.monitor.update_config(config).await.unwrap();
    assert_matches!(
        h.monitor.start().await,
        Err(MonitorError::Config(ConfigError::InvalidValue { var, .. })) if var == "RETENTION_HOURS"
    );
    assert_eq!(h.monitor.state().await, MonitorState::Idle);
}

// ---------------------------------------------------------------------------
// Test: first cycle runs immediately; stop returns to idle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn start_runs_first_cycle_and_stop_returns_to_idle() {
    let source = btc_source(-0.2);
    let h = harness(&[VenueKind::Bybit], vec![as_source(&source)]);
    let mut rx = h.bus.subscribe();

    let session_id = h.monitor.start().await.unwrap();
    assert_eq!(h.monitor.state().await, MonitorState::Running);
    assert_eq!(h.monitor.session_id().await, Some(session_id));

    wait_for_sends(&h.notifier, 1).await;

    h.monitor.stop().await;
    assert_eq!(h.monitor.state().await, MonitorState::Idle);
    assert_eq!(h.monitor.session_id().await, None);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.session_id, session_id);
    assert_matches!(first.kind, EventKind::SessionStarted { channels: 1, .. });

    let mut saw_stop = false;
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.session_id, session_id);
        saw_stop |= event.kind == EventKind::SessionStopped;
    }
    assert!(saw_stop);
}

// ---------------------------------------------------------------------------
// Test: double start and double stop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected_and_stop_is_idempotent() {
    let h = harness(&[VenueKind::Bybit], vec![as_source(&btc_source(-0.2))]);

    h.monitor.start().await.unwrap();
    assert_eq!(h.monitor.start().await, Err(MonitorError::AlreadyRunning));
    assert_matches!(
        h.monitor.update_config(config_for(&[VenueKind::Bybit])).await,
        Err(MonitorError::AlreadyRunning)
    );

    h.monitor.stop().await;
    h.monitor.stop().await;
    assert_eq!(h.monitor.state().await, MonitorState::Idle);
}

#[tokio::test]
async fn stop_when_idle_is_a_noop() {
    let h = harness(&[VenueKind::Bybit], vec![as_source(&btc_source(-0.2))]);
    h.monitor.stop().await;
    assert_eq!(h.monitor.state().await, MonitorState::Idle);
}

// ---------------------------------------------------------------------------
// Test: hysteresis state is per session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn restart_begins_with_empty_fired_state() {
    let source = btc_source(-0.2);
    let h = harness(&[VenueKind::Bybit], vec![as_source(&source)]);

    let first = h.monitor.start().await.unwrap();
    wait_for_sends(&h.notifier, 1).await;

    // Several more cycles in the same session stay silent.
    tokio::time::sleep(Duration::from_secs(180)).await;
    assert!(source.calls() >= 3);
    assert_eq!(h.notifier.count(), 1);
    h.monitor.stop().await;

    let second = h.monitor.start().await.unwrap();
    assert_ne!(first, second);
    wait_for_sends(&h.notifier, 2).await;
    h.monitor.stop().await;
}

// ---------------------------------------------------------------------------
// Test: a panicking cycle does not end the loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn panicking_cycle_is_survived() {
    let source = Arc::new(ScriptedSource::new(
        VenueKind::Bybit,
        vec![
            Step::Panic,
            Step::Rates(vec![("BTCUSDT", 100.0, -0.2)]),
        ],
    ));
    let h = harness(&[VenueKind::Bybit], vec![as_source(&source)]);

    h.monitor.start().await.unwrap();
    wait_for_sends(&h.notifier, 1).await;
    assert_eq!(source.calls(), 2);

    h.monitor.stop().await;
    assert_eq!(h.monitor.state().await, MonitorState::Idle);
}

// ---------------------------------------------------------------------------
// Test: a delivery stuck past the stop timeout is aborted
// ---------------------------------------------------------------------------

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Notifier whose sends never complete.
#[derive(Default)]
struct StuckNotifier {
    entered: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl Notifier for StuckNotifier {
    async fn send(
        &self,
        _signal: &Signal,
        _channel_id: &str,
        _action_url: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let _flag = DropFlag(Arc::clone(&self.dropped));
        self.entered.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn stop_aborts_cycle_stuck_in_delivery() {
    let notifier = Arc::new(StuckNotifier::default());
    let ledger = Arc::new(CooldownLedger::in_memory());
    let monitor = Monitor::new(
        config_for(&[VenueKind::Bybit]),
        vec![as_source(&btc_source(-0.2))],
        notifier.clone(),
        Arc::clone(&ledger),
        Arc::new(EventBus::default()),
    );

    monitor.start().await.unwrap();
    for _ in 0..100 {
        if notifier.entered.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(notifier.entered.load(Ordering::SeqCst));

    monitor.stop().await;

    assert_eq!(monitor.state().await, MonitorState::Idle);
    assert!(notifier.dropped.load(Ordering::SeqCst));
    // The aborted delivery never reached the ledger.
    assert!(ledger.is_empty().await);
}
